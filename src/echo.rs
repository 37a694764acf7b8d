//! Built-in demo service served by `brrtresolver serve`.
//!
//! | Route | Parameters | Notes |
//! |---|---|---|
//! | `GET /health` | | liveness probe |
//! | `GET /echo` | `message: string`, `times: int = 1`, `upper: bool = false` | service error 1001 when `times` is out of range |
//! | `POST /echo` | `message: string`, `tags: array?` | echoes the body parameters |
//! | `GET /whoami` | | requires authentication, projected onto [`WhoAmI`] |

use crate::binder::{ParamType, ParameterSpec};
use crate::error::{AsCode, DispatchError, ServiceError};
use crate::mapper::{MapTarget, ResultMapper};
use crate::registry::{HandlerSpec, Service};
use crate::resolver::HandlerArgs;
use crate::security::AuthRequirement;
use anyhow::anyhow;
use serde_json::{json, Value};

/// Registry identifier of [`EchoService`].
pub const ECHO_SERVICE_ID: &str = "echo";

/// Largest accepted `times`.
pub const MAX_REPEAT: i64 = 10;

/// Application error codes of the echo service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoError {
    RepeatOutOfRange = 1001,
}

impl AsCode for EchoError {
    fn code(&self) -> i64 {
        *self as i64
    }
}

/// Public view of the caller returned by `GET /whoami`.
#[derive(Debug, MapTarget)]
pub struct WhoAmI {
    #[map(rename = "userId")]
    pub user_id: i64,
    pub roles: Vec<i64>,
}

/// Echo handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoService;

impl EchoService {
    fn echo(args: &HandlerArgs) -> Result<Value, DispatchError> {
        let times = args.int("times")?;
        if !(1..=MAX_REPEAT).contains(&times) {
            return Err(ServiceError::new(EchoError::RepeatOutOfRange).into());
        }
        let message = args.str("message")?;
        let message = if args.bool("upper")? {
            message.to_uppercase()
        } else {
            message.to_string()
        };
        let repeated = vec![message.as_str(); times as usize].join(" ");
        Ok(json!({ "message": repeated }))
    }

    fn echo_body(args: &HandlerArgs) -> Result<Value, DispatchError> {
        let tags = args
            .opt_array("tags")?
            .map(|items| items.iter().map(|t| t.to_wire_string()).collect::<Vec<_>>());
        Ok(json!({ "message": args.str("message")?, "tags": tags }))
    }

    fn whoami(args: &HandlerArgs) -> Result<Value, DispatchError> {
        let identity = args
            .identity()
            .ok_or_else(|| DispatchError::Internal(anyhow!("guarded handler ran without identity")))?;
        // `authenticated` is dropped by the WhoAmI projection.
        Ok(json!({
            "userId": identity.user_id,
            "roles": identity.roles,
            "authenticated": true,
        }))
    }
}

impl Service for EchoService {
    fn handlers(&self) -> Vec<HandlerSpec> {
        vec![
            HandlerSpec::get("health", "/health"),
            HandlerSpec::get("echo", "/echo")
                .param(ParameterSpec::new("message", ParamType::String))
                .param(ParameterSpec::new("times", ParamType::Int).default_value(1))
                .param(ParameterSpec::new("upper", ParamType::Bool).default_value(false)),
            HandlerSpec::post("echo_body", "/echo")
                .param(ParameterSpec::new("message", ParamType::String))
                .param(ParameterSpec::new("tags", ParamType::Array).nullable()),
            HandlerSpec::get("whoami", "/whoami")
                .authenticated(AuthRequirement::authenticated())
                .map(ResultMapper::to::<WhoAmI>()),
        ]
    }

    fn call(&self, handler: &str, args: HandlerArgs) -> Result<Value, DispatchError> {
        match handler {
            "health" => Ok(json!({ "status": "ok" })),
            "echo" => Self::echo(&args),
            "echo_body" => Self::echo_body(&args),
            "whoami" => Self::whoami(&args),
            other => Err(DispatchError::Internal(anyhow!(
                "echo service has no handler '{other}'"
            ))),
        }
    }
}
