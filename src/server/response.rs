use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Content type of every response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// The single wire shape of every resolver outcome except the 500 fallback.
///
/// ```json
/// { "errors": [int, ...], "response": <payload> | null }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Error codes; empty on success.
    pub errors: Vec<i64>,
    /// Handler result, `null` on failure.
    pub response: Value,
}

impl ResponseEnvelope {
    /// Successful outcome carrying `payload`.
    #[must_use]
    pub fn success(payload: Value) -> Self {
        Self {
            errors: Vec::new(),
            response: payload,
        }
    }

    /// Failed outcome carrying `codes`.
    pub fn failure(codes: impl Into<Vec<i64>>) -> Self {
        Self {
            errors: codes.into(),
            response: Value::Null,
        }
    }
}

/// Status and JSON body produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl HttpResponse {
    /// Response carrying `envelope` with `status`.
    #[must_use]
    pub fn envelope(status: u16, envelope: &ResponseEnvelope) -> Self {
        Self {
            status,
            body: json!({ "errors": envelope.errors, "response": envelope.response }),
        }
    }

    /// Diagnostic 500 body: the error message and its cause chain.
    #[must_use]
    pub fn internal(error: &anyhow::Error) -> Self {
        let details: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        Self {
            status: 500,
            body: json!({ "error": error.to_string(), "details": details }),
        }
    }

    /// Body parsed back into an envelope; `None` for the 500 diagnostic.
    #[must_use]
    pub fn to_envelope(&self) -> Option<ResponseEnvelope> {
        serde_json::from_value(self.body.clone()).ok()
    }

    /// Content type header value.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    /// Serialized body.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.to_string().into_bytes()
    }
}
