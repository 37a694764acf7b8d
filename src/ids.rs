//! Request ids for the `resolve` span.
//!
//! A caller may pin the id with an `X-Request-Id` header carrying a ULID;
//! anything else gets a fresh one, so every log line of a resolution shares
//! one sortable id.

use crate::server::Request;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Header a caller may use to supply its own request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ULID of one resolution.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RequestId(Ulid);

impl RequestId {
    /// Fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Id for `req`: its `X-Request-Id` header when that is a valid ULID,
    /// otherwise a fresh one.
    #[must_use]
    pub fn for_request(req: &Request) -> Self {
        req.header(REQUEST_ID_HEADER)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}
