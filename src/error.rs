//! # Error Taxonomy
//!
//! Every failure that can end a resolution is a [`DispatchError`]. The resolver
//! catches it exactly once, at its outermost boundary, and turns it into the
//! response envelope:
//!
//! | Variant | HTTP status | `errors` |
//! |---|---|---|
//! | [`DispatchError::MalformedRequest`] | 400 | `[400]` |
//! | [`DispatchError::Unauthorized`] | 401 | `[401]` |
//! | [`DispatchError::NotFound`] | 404 | `[404]` |
//! | [`DispatchError::Service`] | 200 | the service error codes |
//! | [`DispatchError::Internal`] | 500 | diagnostic body, not an envelope |
//!
//! Handlers signal failure by returning one of these, never with sentinel
//! values.

use crate::security::AuthError;
use thiserror::Error;

/// Anything that carries a numeric code.
///
/// Implemented for the primitive integers; application enums implement it to be
/// usable as role identifiers and service error codes without a manual cast.
///
/// ```rust
/// use brrtresolver::error::AsCode;
///
/// #[derive(Clone, Copy)]
/// enum Role { Admin = 1, Editor = 2 }
///
/// impl AsCode for Role {
///     fn code(&self) -> i64 { *self as i64 }
/// }
///
/// assert_eq!(Role::Editor.code(), 2);
/// assert_eq!(5_i32.code(), 5);
/// ```
pub trait AsCode {
    /// The integer value of this code.
    fn code(&self) -> i64;
}

macro_rules! impl_as_code {
    ($($t:ty),*) => {
        $(impl AsCode for $t {
            #[inline]
            fn code(&self) -> i64 {
                i64::from(*self)
            }
        })*
    };
}

impl_as_code!(i8, i16, i32, i64, u8, u16, u32);

impl<T: AsCode + ?Sized> AsCode for &T {
    #[inline]
    fn code(&self) -> i64 {
        (**self).code()
    }
}

/// Application-level failure that keeps the HTTP transaction successful.
///
/// Serialized as `{"errors": [codes...], "response": null}` with status 200.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("service error {codes:?}")]
pub struct ServiceError {
    codes: Vec<i64>,
}

impl ServiceError {
    /// A service error carrying a single code.
    pub fn new(code: impl AsCode) -> Self {
        Self {
            codes: vec![code.code()],
        }
    }

    /// A service error carrying several codes, in the given order.
    pub fn with_codes<I>(codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsCode,
    {
        Self {
            codes: codes.into_iter().map(|c| c.code()).collect(),
        }
    }

    /// The codes, in the order they were raised.
    #[must_use]
    pub fn codes(&self) -> &[i64] {
        &self.codes
    }
}

/// Failure of a single resolution.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Missing required parameter or a parameter that failed coercion.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// Missing or invalid credential, or insufficient role.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    /// No handler matches the verb and path.
    #[error("no handler for {method} {path}")]
    NotFound {
        /// Verb as received.
        method: String,
        /// Path as received, without query string.
        path: String,
    },
    /// Business operation reported application error codes.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// Anything else; answered with a 500 diagnostic.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// Shorthand for [`DispatchError::MalformedRequest`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        DispatchError::MalformedRequest(reason.into())
    }

    /// Fixed HTTP status of the HTTP-classified kinds (400, 401, 404).
    ///
    /// `None` for service errors and unclassified failures.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            DispatchError::MalformedRequest(_) => Some(400),
            DispatchError::Unauthorized(_) => Some(401),
            DispatchError::NotFound { .. } => Some(404),
            DispatchError::Service(_) | DispatchError::Internal(_) => None,
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::MalformedRequest(_) => "malformed_request",
            DispatchError::Unauthorized(_) => "unauthorized",
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::Service(_) => "service_error",
            DispatchError::Internal(_) => "unclassified",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum Failure {
        OutOfStock = 1001,
        Discontinued = 1002,
    }

    impl AsCode for Failure {
        fn code(&self) -> i64 {
            *self as i64
        }
    }

    #[test]
    fn test_service_error_normalizes_enum_codes() {
        let err = ServiceError::with_codes([Failure::OutOfStock, Failure::Discontinued]);
        assert_eq!(err.codes(), &[1001, 1002]);
    }

    #[test]
    fn test_service_error_single_code() {
        assert_eq!(ServiceError::new(7_u16).codes(), &[7]);
    }

    #[test]
    fn test_http_status_per_kind() {
        assert_eq!(DispatchError::malformed("x").http_status(), Some(400));
        assert_eq!(
            DispatchError::Unauthorized(AuthError::MissingCredential).http_status(),
            Some(401)
        );
        let nf = DispatchError::NotFound {
            method: "GET".into(),
            path: "/nope".into(),
        };
        assert_eq!(nf.http_status(), Some(404));
        assert_eq!(
            DispatchError::from(ServiceError::new(1)).http_status(),
            None
        );
        assert_eq!(
            DispatchError::from(anyhow::anyhow!("boom")).http_status(),
            None
        );
    }
}
