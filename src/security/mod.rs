//! # Security Module
//!
//! Authentication gating for handlers.
//!
//! ## Overview
//!
//! A handler may carry an [`AuthRequirement`]: the set of role identifiers the
//! caller must hold. An empty set still requires an authenticated caller.
//! Enforcement is delegated to an [`Authenticator`], which either returns the
//! caller's [`Identity`] or fails with an [`AuthError`]. There is no `bool`
//! answer: a caller that is not allowed through is always an error, and the
//! resolver turns every [`AuthError`] into a 401 envelope before the handler
//! body runs.
//!
//! ## Role identifiers
//!
//! Roles are plain integers. Application enums become roles by implementing
//! [`AsCode`](crate::error::AsCode); they are normalised to integers when the
//! requirement is built.
//!
//! ```rust
//! use brrtresolver::error::AsCode;
//! use brrtresolver::security::AuthRequirement;
//!
//! #[derive(Clone, Copy)]
//! enum Role { Admin = 1, Auditor = 5 }
//! impl AsCode for Role {
//!     fn code(&self) -> i64 { *self as i64 }
//! }
//!
//! assert_eq!(AuthRequirement::role(Role::Auditor).required_roles(), &[5]);
//! assert_eq!(AuthRequirement::roles([Role::Auditor, Role::Admin]).required_roles(), &[1, 5]);
//! assert!(AuthRequirement::authenticated().required_roles().is_empty());
//! ```
//!
//! ## Providers
//!
//! - [`JwtAuthenticator`] - HS512 bearer tokens carrying a user id and a role list

use crate::error::AsCode;
use crate::server::HeaderVec;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

mod jwt;

pub use jwt::{JwtAuthenticator, JwtClaims, DEFAULT_EXPIRATION_MINUTES};

/// Roles required to invoke a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequirement {
    roles: Vec<i64>,
}

impl AuthRequirement {
    /// Any authenticated caller.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Caller must hold `role`.
    pub fn role(role: impl AsCode) -> Self {
        Self {
            roles: vec![role.code()],
        }
    }

    /// Caller must hold every role in `roles`.
    pub fn roles<I>(roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsCode,
    {
        let mut roles: Vec<i64> = roles.into_iter().map(|r| r.code()).collect();
        roles.sort_unstable();
        roles.dedup();
        Self { roles }
    }

    /// Required role identifiers, ascending, without duplicates.
    #[must_use]
    pub fn required_roles(&self) -> &[i64] {
        &self.roles
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Caller's user identifier.
    pub user_id: i64,
    /// Roles held by the caller.
    pub roles: Vec<i64>,
}

impl Identity {
    /// Build an identity from a user id and its roles.
    pub fn new<I>(user_id: i64, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsCode,
    {
        Self {
            user_id,
            roles: roles.into_iter().map(|r| r.code()).collect(),
        }
    }

    /// `true` if the caller holds `role`.
    #[inline]
    #[must_use]
    pub fn has_role(&self, role: i64) -> bool {
        self.roles.contains(&role)
    }

    /// Succeeds only if every role in `required` is held.
    pub fn require_roles(&self, required: &[i64]) -> Result<(), AuthError> {
        if required.iter().all(|r| self.has_role(*r)) {
            Ok(())
        } else {
            Err(AuthError::InsufficientRoles {
                required: required.to_vec(),
                held: self.roles.clone(),
            })
        }
    }
}

/// Why a caller was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No usable credential on the request.
    #[error("missing credential")]
    MissingCredential,
    /// Credential present but rejected.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Caller is authenticated but lacks a required role.
    #[error("insufficient roles (required: {required:?}, held: {held:?})")]
    InsufficientRoles {
        /// Roles the handler requires.
        required: Vec<i64>,
        /// Roles the caller holds.
        held: Vec<i64>,
    },
}

impl AuthError {
    /// Log the refusal with structured fields.
    pub fn log(&self) {
        match self {
            AuthError::MissingCredential => {
                debug!("Authentication failed: missing credential (no Bearer token)");
            }
            AuthError::InvalidToken(reason) => {
                warn!(reason = %reason, "Authentication failed: invalid token");
            }
            AuthError::InsufficientRoles { required, held } => {
                warn!(
                    required = ?required,
                    held = ?held,
                    "Authorization failed: insufficient roles"
                );
            }
        }
    }
}

/// Credential view of an incoming request.
///
/// Borrowed from the request so authenticators never copy header data.
#[derive(Debug, Clone, Copy)]
pub struct SecurityRequest<'a> {
    /// Request headers (name, value).
    pub headers: &'a HeaderVec,
}

impl<'a> SecurityRequest<'a> {
    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Token issuer/verifier consulted for guarded handlers.
///
/// Implementations must be safe for concurrent read-only use: one instance is
/// shared by every resolution.
pub trait Authenticator: Send + Sync {
    /// Verify the caller's credential and return who they are.
    fn authenticate(&self, req: &SecurityRequest<'_>) -> Result<Identity, AuthError>;

    /// Non-failing variant of [`authenticate`](Self::authenticate): `None` if
    /// the caller is not logged in.
    fn identify(&self, req: &SecurityRequest<'_>) -> Option<Identity> {
        self.authenticate(req).ok()
    }

    /// Authenticate and check that every role in `required_roles` is held.
    ///
    /// An empty `required_roles` accepts any authenticated caller.
    fn require_auth(
        &self,
        req: &SecurityRequest<'_>,
        required_roles: &[i64],
    ) -> Result<Identity, AuthError> {
        let identity = self.authenticate(req)?;
        identity.require_roles(required_roles)?;
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct HeaderRoles;

    impl Authenticator for HeaderRoles {
        fn authenticate(&self, req: &SecurityRequest<'_>) -> Result<Identity, AuthError> {
            let roles = req.get_header("x-roles").ok_or(AuthError::MissingCredential)?;
            let roles = roles
                .split(',')
                .map(|r| r.parse::<i64>().map_err(|e| AuthError::InvalidToken(e.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Identity::new(1, roles))
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderVec {
        pairs
            .iter()
            .map(|(k, v)| (Arc::from(*k), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_requirement_dedups_roles() {
        let req = AuthRequirement::roles([3, 1, 3]);
        assert_eq!(req.required_roles(), &[1, 3]);
    }

    #[test]
    fn test_require_auth_missing_role() {
        let h = headers(&[("X-Roles", "1,2")]);
        let req = SecurityRequest { headers: &h };
        let err = HeaderRoles.require_auth(&req, &[5]).unwrap_err();
        assert_eq!(
            err,
            AuthError::InsufficientRoles {
                required: vec![5],
                held: vec![1, 2]
            }
        );
    }

    #[test]
    fn test_require_auth_all_roles_needed() {
        let h = headers(&[("x-roles", "1,2")]);
        let req = SecurityRequest { headers: &h };
        assert!(HeaderRoles.require_auth(&req, &[1, 2]).is_ok());
        assert!(HeaderRoles.require_auth(&req, &[1, 3]).is_err());
    }

    #[test]
    fn test_empty_requirement_needs_credential() {
        let h = headers(&[]);
        let req = SecurityRequest { headers: &h };
        assert_eq!(
            HeaderRoles.require_auth(&req, &[]),
            Err(AuthError::MissingCredential)
        );
        assert!(HeaderRoles.identify(&req).is_none());
    }
}
