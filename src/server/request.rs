use crate::binder::{ParamValue, Params};
use crate::error::DispatchError;
use crate::security::SecurityRequest;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// Maximum number of headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Request headers as (name, value), in arrival order.
///
/// Names are `Arc<str>` so transports can share interned header names.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Everything the resolver reads from an inbound request.
///
/// Built explicitly by the transport (or by a test) and handed to the
/// resolver; nothing is read from ambient state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// Verb as received (`"GET"`, `"POST"`, ...).
    pub method: String,
    /// Path without the query string.
    pub path: String,
    /// Query string parameters.
    pub query: Params,
    /// Body parameters (form or JSON object).
    pub body: Params,
    /// Request headers.
    pub headers: HeaderVec,
    /// Why the body could not be used, reported only to a POST handler.
    body_error: Option<String>,
}

impl Request {
    /// Empty request for `method path`.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Empty `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Empty `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.query.insert(name, value);
        self
    }

    /// Add a body parameter.
    #[must_use]
    pub fn with_body(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.body.insert(name, value);
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// Header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.security().get_header(name)
    }

    /// Credential view handed to authenticators.
    #[must_use]
    pub fn security(&self) -> SecurityRequest<'_> {
        SecurityRequest {
            headers: &self.headers,
        }
    }

    /// Mark the body as unusable.
    ///
    /// Body parameters are dropped. The request still routes and
    /// authenticates; [`Request::body_params`] reports `reason` when a POST
    /// handler asks for its arguments.
    #[must_use]
    pub fn reject_body(mut self, reason: impl Into<String>) -> Self {
        self.body = Params::new();
        self.body_error = Some(reason.into());
        self
    }

    /// Body parameters for binding.
    ///
    /// # Errors
    ///
    /// [`DispatchError::MalformedRequest`] if the body was rejected while the
    /// request was built.
    pub fn body_params(&self) -> Result<&Params, DispatchError> {
        match &self.body_error {
            Some(reason) => Err(DispatchError::malformed(reason.clone())),
            None => Ok(&self.body),
        }
    }

    /// Build a request from its wire parts.
    ///
    /// The path is `raw_uri` up to the first `?`. Query string and form bodies
    /// are `application/x-www-form-urlencoded`; a body sent as
    /// `application/json` must be a JSON object. A JSON body that fails that
    /// check is kept as a [`Request::reject_body`] reason, so a GET or an
    /// unknown route answers as if no body had been sent.
    pub fn parse(method: &str, raw_uri: &str, headers: HeaderVec, body: &[u8]) -> Self {
        let (path, query) = match raw_uri.split_once('?') {
            Some((path, query)) => (path, parse_form(query.as_bytes())),
            None => (raw_uri, Params::new()),
        };

        let mut request = Self {
            method: method.to_string(),
            path: path.to_string(),
            query,
            headers,
            ..Self::default()
        };

        if !body.is_empty() {
            let is_json = request
                .header("content-type")
                .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("application/json"));
            if is_json {
                match parse_json_body(body) {
                    Ok(params) => request.body = params,
                    Err(reason) => request = request.reject_body(reason),
                }
            } else {
                request.body = parse_form(body);
            }
        }

        debug!(
            method = %request.method,
            path = %request.path,
            query_params = request.query.len(),
            body_params = request.body.len(),
            body_rejected = request.body_error.is_some(),
            header_count = request.headers.len(),
            "HTTP request parsed"
        );
        request
    }
}

/// Decode `application/x-www-form-urlencoded` input.
///
/// `name[]` keys accumulate into an array under `name`; any other repeated key
/// is resolved by last-write-wins lookup.
pub fn parse_form(input: &[u8]) -> Params {
    let mut params = Params::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        let value = ParamValue::String(value.into_owned());
        match key.strip_suffix("[]") {
            Some(name) => {
                if let Some(ParamValue::Array(items)) = params.get_mut(name) {
                    items.push(value);
                    continue;
                }
                params.insert(name, ParamValue::Array(vec![value]));
            }
            None => params.insert(key.into_owned(), value),
        }
    }
    params
}

fn parse_json_body(body: &[u8]) -> Result<Params, String> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| format!("invalid JSON body: {e}"))?;
    let Value::Object(fields) = value else {
        return Err("JSON body must be an object".to_string());
    };
    Ok(fields
        .into_iter()
        .filter_map(|(name, value)| json_param(value).map(|v| (name, v)))
        .collect())
}

// Wire parameters are strings, string arrays or null.
fn json_param(value: Value) -> Option<ParamValue> {
    match value {
        Value::Null => Some(ParamValue::Null),
        Value::Array(items) => Some(ParamValue::Array(
            items.into_iter().filter_map(json_scalar).collect(),
        )),
        Value::Object(_) => None,
        scalar => json_scalar(scalar),
    }
}

fn json_scalar(value: Value) -> Option<ParamValue> {
    match value {
        Value::String(s) => Some(ParamValue::String(s)),
        Value::Bool(b) => Some(ParamValue::String(b.to_string())),
        Value::Number(n) => Some(ParamValue::String(n.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
