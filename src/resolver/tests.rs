use super::core::handler_outcome;
use super::{error_response, respond, BoundArgs, HandlerArgs, RouteResolver};
use crate::binder::ParamValue;
use crate::error::{DispatchError, ServiceError};
use crate::registry::{HandlerSpec, Service, ServiceContainer};
use crate::security::{AuthError, AuthRequirement, Identity};
use crate::server::Request;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;

struct Panicky;

impl Service for Panicky {
    fn handlers(&self) -> Vec<HandlerSpec> {
        vec![
            HandlerSpec::get("boom", "/boom"),
            HandlerSpec::get("refuse", "/refuse"),
            HandlerSpec::get("guarded", "/guarded").authenticated(AuthRequirement::authenticated()),
        ]
    }

    fn call(&self, handler: &str, _args: HandlerArgs) -> Result<Value, DispatchError> {
        match handler {
            "boom" => panic!("handler exploded"),
            "refuse" => Err(ServiceError::new(7_u16).into()),
            _ => Ok(Value::Null),
        }
    }
}

fn args(pairs: &[(&str, ParamValue)]) -> HandlerArgs {
    let values: BoundArgs = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    HandlerArgs::new(values, Some(Identity::new(9, [1])))
}

#[test]
fn test_args_typed_accessors() {
    let a = args(&[
        ("id", ParamValue::Int(7)),
        ("ratio", ParamValue::Float(0.5)),
        ("active", ParamValue::Bool(true)),
        ("name", ParamValue::from("ada")),
        ("tags", ParamValue::from(vec!["a", "b"])),
        ("maybe", ParamValue::Null),
    ]);
    assert_eq!(a.int("id").unwrap(), 7);
    assert_eq!(a.float("ratio").unwrap(), 0.5);
    assert!(a.bool("active").unwrap());
    assert_eq!(a.str("name").unwrap(), "ada");
    assert_eq!(a.array("tags").unwrap().len(), 2);
    assert_eq!(a.opt_int("maybe").unwrap(), None);
    assert_eq!(a.identity().map(|i| i.user_id), Some(9));
    assert_eq!(a.values().len(), 6);
}

#[test]
fn test_args_misuse_is_internal() {
    let a = args(&[("name", ParamValue::from("ada")), ("maybe", ParamValue::Null)]);
    assert!(matches!(a.int("name"), Err(DispatchError::Internal(_))));
    assert!(matches!(a.int("undeclared"), Err(DispatchError::Internal(_))));
    assert!(matches!(a.int("maybe"), Err(DispatchError::Internal(_))));
}

#[test]
fn test_respond_serializes() {
    #[derive(serde::Serialize)]
    struct Dto {
        id: i64,
    }
    assert_eq!(respond(&Dto { id: 3 }).unwrap(), json!({"id": 3}));
}

#[test]
fn test_error_response_classified() {
    let res = error_response(DispatchError::malformed("bad"));
    assert_eq!((res.status, res.body), (400, json!({"errors": [400], "response": null})));

    let res = error_response(DispatchError::Unauthorized(AuthError::MissingCredential));
    assert_eq!((res.status, res.body), (401, json!({"errors": [401], "response": null})));

    let res = error_response(DispatchError::NotFound {
        method: "GET".into(),
        path: "/x".into(),
    });
    assert_eq!((res.status, res.body), (404, json!({"errors": [404], "response": null})));
}

#[test]
fn test_error_response_service_error_keeps_200() {
    let res = error_response(ServiceError::with_codes([1001, 1002]).into());
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"errors": [1001, 1002], "response": null}));
}

#[test]
fn test_error_response_internal_is_diagnostic() {
    let res = error_response(anyhow::anyhow!("db down").into());
    assert_eq!(res.status, 500);
    assert_eq!(res.body["error"], "db down");
    assert!(res.to_envelope().is_none());
}

#[test]
fn test_handler_panic_becomes_500() {
    let resolver = RouteResolver::new(ServiceContainer::new().with_service("p", Arc::new(Panicky)));
    let res = resolver.resolve(&Request::get("/boom"));
    assert_eq!(res.status, 500);
    assert!(res.body["error"]
        .as_str()
        .is_some_and(|m| m.contains("handler exploded")));
}

#[test]
fn test_guarded_route_without_authenticator_is_500() {
    let resolver = RouteResolver::new(ServiceContainer::new().with_service("p", Arc::new(Panicky)));
    let res = resolver.resolve(&Request::get("/guarded"));
    assert_eq!(res.status, 500);
}

#[test]
fn test_routes_skip_unregistered_candidates() {
    let mut container = ServiceContainer::new();
    container.declare("ghost");
    container.register("p", Arc::new(Panicky));
    let resolver = RouteResolver::new(container);
    let routes: Vec<String> = resolver
        .routes()
        .iter()
        .map(|(id, spec)| format!("{id} {}", spec.route))
        .collect();
    assert_eq!(routes, vec!["p GET /boom", "p GET /refuse", "p GET /guarded"]);
}

#[test]
fn test_find_handler_exact_match_only() {
    let resolver = RouteResolver::new(ServiceContainer::new().with_service("p", Arc::new(Panicky)));
    assert!(resolver.find_handler("GET", "/boom").is_some());
    assert!(resolver.find_handler("GET", "/boom/").is_none());
    assert!(resolver.find_handler("POST", "/boom").is_none());
    assert!(resolver.find_handler("get", "/boom").is_none());
}

#[test]
fn test_handler_outcome_labels_every_result() {
    assert_eq!(handler_outcome(&Ok(Ok(Value::Null))), "ok");
    assert_eq!(
        handler_outcome(&Ok(Err(ServiceError::new(7_u16).into()))),
        "service_error"
    );
    assert_eq!(
        handler_outcome(&Ok(Err(anyhow::anyhow!("db down").into()))),
        "unclassified"
    );
    let payload: Box<dyn Any + Send> = Box::new("boom");
    assert_eq!(handler_outcome(&Err(payload)), "panic");
}

#[test]
fn test_failing_handler_still_resolves() {
    let resolver = RouteResolver::new(ServiceContainer::new().with_service("p", Arc::new(Panicky)));
    let res = resolver.resolve(&Request::get("/refuse"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"errors": [7], "response": null}));
}

#[test]
fn test_rejected_body_only_fails_post_binding() {
    let resolver = RouteResolver::new(ServiceContainer::new().with_service("p", Arc::new(Panicky)));
    let res = resolver.resolve(&Request::get("/refuse").reject_body("bad body"));
    assert_eq!(res.body["errors"], json!([7]));
    let res = resolver.resolve(&Request::post("/nowhere").reject_body("bad body"));
    assert_eq!(res.status, 404);
}
