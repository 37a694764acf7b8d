#![allow(dead_code)]

pub mod fixtures {
    use brrtresolver::binder::{ParamType, ParameterSpec};
    use brrtresolver::error::{AsCode, DispatchError, ServiceError};
    use brrtresolver::mapper::{MapTarget, ResultMapper};
    use brrtresolver::registry::{HandlerSpec, Service, ServiceContainer};
    use brrtresolver::resolver::{HandlerArgs, RouteResolver};
    use brrtresolver::security::{AuthRequirement, Authenticator, JwtAuthenticator};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub const TEST_SECRET: &str = "integration-secret";
    pub const TEST_ISSUER: &str = "https://issuer.brrtresolver.test";
    pub const TEST_AUDIENCE: &str = "brrtresolver-tests";

    #[derive(Debug, Clone, Copy)]
    pub enum Role {
        Member = 1,
        Editor = 2,
        Auditor = 5,
    }

    impl AsCode for Role {
        fn code(&self) -> i64 {
            *self as i64
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub enum OrderError {
        OutOfStock = 1001,
        LimitExceeded = 1002,
    }

    impl AsCode for OrderError {
        fn code(&self) -> i64 {
            *self as i64
        }
    }

    #[derive(MapTarget)]
    pub struct PublicUser {
        pub id: i64,
        pub name: String,
    }

    /// Counts handler invocations so tests can assert a handler never ran.
    #[derive(Default)]
    pub struct UserService {
        pub calls: AtomicUsize,
    }

    impl UserService {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn user(id: i64) -> Value {
        json!({
            "id": id,
            "name": format!("user-{id}"),
            "email": format!("user-{id}@example.com"),
            "passwordHash": "not-for-the-wire",
        })
    }

    impl Service for UserService {
        fn handlers(&self) -> Vec<HandlerSpec> {
            vec![
                HandlerSpec::get("get_user", "/user")
                    .param(ParameterSpec::new("id", ParamType::Int)),
                HandlerSpec::get("public_user", "/user/public")
                    .param(ParameterSpec::new("id", ParamType::Int))
                    .map(ResultMapper::to::<PublicUser>()),
                HandlerSpec::get("list_users", "/users")
                    .param(ParameterSpec::new("ids", ParamType::Array))
                    .map(ResultMapper::to::<PublicUser>()),
                HandlerSpec::get("broken_map", "/user/broken")
                    .map(ResultMapper::fields("Broken", ["id", "nickname"])),
                HandlerSpec::get("search", "/search")
                    .param(ParameterSpec::new("q", ParamType::String).nullable())
                    .param(ParameterSpec::new("limit", ParamType::Int).default_value(10))
                    .param(ParameterSpec::new("active", ParamType::Bool).nullable())
                    .param(ParameterSpec::new("ratio", ParamType::Float).nullable()),
                HandlerSpec::post("create_user", "/user")
                    .param(ParameterSpec::new("name", ParamType::String))
                    .param(ParameterSpec::new("age", ParamType::Int).nullable())
                    .param(ParameterSpec::new("tags", ParamType::Array).nullable()),
                HandlerSpec::get("me", "/me").authenticated(AuthRequirement::authenticated()),
                HandlerSpec::get("audit", "/admin/audit")
                    .authenticated(AuthRequirement::role(Role::Auditor)),
                HandlerSpec::post("publish", "/admin/publish")
                    .authenticated(AuthRequirement::roles([Role::Member, Role::Editor])),
            ]
        }

        fn call(&self, handler: &str, args: HandlerArgs) -> Result<Value, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match handler {
                "get_user" | "public_user" => Ok(user(args.int("id")?)),
                "list_users" => args
                    .array("ids")?
                    .iter()
                    .map(|id| {
                        id.as_str()
                            .and_then(|s| s.parse().ok())
                            .map(user)
                            .ok_or_else(|| DispatchError::malformed("ids must be integers"))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                "broken_map" => Ok(json!({ "id": 1 })),
                "search" => Ok(json!({
                    "q": args.opt_str("q")?,
                    "limit": args.int("limit")?,
                    "active": args.opt_bool("active")?,
                    "ratio": args.opt_float("ratio")?,
                })),
                "create_user" => Ok(json!({
                    "name": args.str("name")?,
                    "age": args.opt_int("age")?,
                    "tags": args.get("tags"),
                })),
                "me" | "audit" | "publish" => {
                    let identity = args
                        .identity()
                        .ok_or_else(|| DispatchError::malformed("no identity"))?;
                    Ok(json!({ "handler": handler, "userId": identity.user_id }))
                }
                other => Err(DispatchError::Internal(anyhow::anyhow!("unknown handler {other}"))),
            }
        }
    }

    /// Raises service errors.
    pub struct OrderService;

    impl Service for OrderService {
        fn handlers(&self) -> Vec<HandlerSpec> {
            vec![HandlerSpec::post("place", "/order").param(ParameterSpec::new("qty", ParamType::Int))]
        }

        fn call(&self, _handler: &str, args: HandlerArgs) -> Result<Value, DispatchError> {
            let qty = args.int("qty")?;
            if qty > 100 {
                return Err(
                    ServiceError::with_codes([OrderError::OutOfStock, OrderError::LimitExceeded]).into(),
                );
            }
            Ok(json!({ "qty": qty }))
        }
    }

    /// Declares `GET /user` again; must never win over [`UserService`].
    pub struct ShadowService;

    impl Service for ShadowService {
        fn handlers(&self) -> Vec<HandlerSpec> {
            vec![
                HandlerSpec::get("shadow_user", "/user"),
                HandlerSpec::get("shadow_first", "/dup"),
                HandlerSpec::get("shadow_second", "/dup"),
            ]
        }

        fn call(&self, handler: &str, _args: HandlerArgs) -> Result<Value, DispatchError> {
            Ok(json!({ "handler": handler }))
        }
    }

    pub fn authenticator() -> JwtAuthenticator {
        JwtAuthenticator::new(TEST_SECRET, TEST_ISSUER, TEST_AUDIENCE)
    }

    pub fn token(user_id: i64, roles: &[i64]) -> String {
        authenticator()
            .generate_token(user_id, roles)
            .expect("token should sign")
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    /// Resolver over a declared-but-unregistered service, then users, orders
    /// and the shadow service, in that order.
    pub fn resolver() -> (RouteResolver, Arc<UserService>) {
        let users = Arc::new(UserService::default());
        let mut container = ServiceContainer::new();
        container.declare("ghost");
        container.register("users", Arc::clone(&users) as Arc<dyn Service>);
        container.register("orders", Arc::new(OrderService));
        container.register("shadow", Arc::new(ShadowService));
        let resolver = RouteResolver::new(container)
            .with_authenticator(Arc::new(authenticator()) as Arc<dyn Authenticator>);
        (resolver, users)
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    pub struct RawResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).expect("response body should be JSON")
        }
    }

    /// Send one request and read the response until the server closes.
    pub fn send_request(
        addr: SocketAddr,
        method: &str,
        target: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> RawResponse {
        let mut stream = TcpStream::connect(addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("timeout");
        let mut request = format!(
            "{method} {target} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\nContent-Length: {}\r\n",
            body.len()
        );
        for (k, v) in headers {
            request.push_str(&format!("{k}: {v}\r\n"));
        }
        request.push_str("\r\n");
        request.push_str(body);
        stream.write_all(request.as_bytes()).expect("write");

        let mut raw = String::new();
        stream.read_to_string(&mut raw).expect("read");
        let (head, body) = raw.split_once("\r\n\r\n").expect("header terminator");
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .expect("status line");
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        RawResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }
}

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// YAML file deleted when the handle drops.
    pub fn yaml(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        file
    }
}
