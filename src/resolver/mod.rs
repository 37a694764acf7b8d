//! # Resolver Module
//!
//! The route resolution and dispatch pipeline. One call to
//! [`RouteResolver::resolve`] takes a [`Request`](crate::server::Request) to
//! exactly one [`HttpResponse`](crate::server::HttpResponse).
//!
//! ## Pipeline
//!
//! 1. Enumerate candidate services from the [`ServiceRegistry`](crate::registry::ServiceRegistry);
//!    candidates without an instance are skipped
//! 2. Take the first handler, in service then handler order, whose route
//!    matches the verb and path exactly; none is a 404
//! 3. If the handler is guarded, ask the [`Authenticator`](crate::security::Authenticator)
//!    to require its roles; any refusal is a 401 and the handler never runs
//! 4. Bind declared parameters from the query (GET) or the body (POST); a
//!    missing or uncoercible value is a 400
//! 5. Invoke the handler; a panic is caught and reported as a 500
//! 6. Apply the handler's [`ResultMapper`](crate::mapper::ResultMapper), if any
//!
//! Every failure is terminal. Failures are translated once, in
//! [`error_response`]:
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | success | 200 | `{"errors": [], "response": <payload>}` |
//! | malformed request / unauthorized / not found | 400 / 401 / 404 | `{"errors": [status], "response": null}` |
//! | service error | 200 | `{"errors": [codes...], "response": null}` |
//! | anything else | 500 | `{"error": <message>, "details": [<causes>]}` |
//!
//! ## Example
//!
//! ```rust
//! use brrtresolver::binder::{ParamType, ParameterSpec};
//! use brrtresolver::error::DispatchError;
//! use brrtresolver::registry::{HandlerSpec, Service, ServiceContainer};
//! use brrtresolver::resolver::{HandlerArgs, RouteResolver};
//! use brrtresolver::server::Request;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct UserService;
//!
//! impl Service for UserService {
//!     fn handlers(&self) -> Vec<HandlerSpec> {
//!         vec![HandlerSpec::get("get_user", "/user")
//!             .param(ParameterSpec::new("id", ParamType::Int))]
//!     }
//!
//!     fn call(&self, _handler: &str, args: HandlerArgs) -> Result<Value, DispatchError> {
//!         Ok(json!({ "id": args.int("id")? }))
//!     }
//! }
//!
//! let resolver = RouteResolver::new(
//!     ServiceContainer::new().with_service("users", Arc::new(UserService)),
//! );
//!
//! let ok = resolver.resolve(&Request::get("/user").with_query("id", "7"));
//! assert_eq!(ok.status, 200);
//! assert_eq!(ok.body, json!({"errors": [], "response": {"id": 7}}));
//!
//! let bad = resolver.resolve(&Request::get("/user").with_query("id", "abc"));
//! assert_eq!(bad.status, 400);
//! assert_eq!(bad.body, json!({"errors": [400], "response": null}));
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{
    error_response, respond, BoundArgs, HandlerArgs, HandlerDescriptor, RouteResolver,
};
