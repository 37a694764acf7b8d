use super::{AuthError, Authenticator, Identity, SecurityRequest};
use crate::error::AsCode;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static BEARER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Bearer\s(\S+)").expect("bearer regex should be valid"));

/// Delimiter of the encoded role list (`";1;2;"`).
const ROLE_DELIMITER: char = ';';

/// Default token lifetime used by [`JwtAuthenticator::generate_token`].
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 30;

/// Claims carried by tokens this authenticator issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued at (unix seconds).
    pub iat: u64,
    /// Not before (unix seconds).
    pub nbf: u64,
    /// Expiry (unix seconds).
    pub exp: u64,
    /// User identifier.
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Roles encoded as `";r1;r2;"`.
    pub roles: String,
}

impl JwtClaims {
    /// Decode the role list: the outer delimiters are stripped, every non-empty
    /// segment must be an integer.
    pub fn decode_roles(&self) -> Result<Vec<i64>, AuthError> {
        let inner = self
            .roles
            .strip_prefix(ROLE_DELIMITER)
            .unwrap_or(&self.roles);
        let inner = inner.strip_suffix(ROLE_DELIMITER).unwrap_or(inner);
        inner
            .split(ROLE_DELIMITER)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .map_err(|_| AuthError::InvalidToken(format!("invalid role '{s}'")))
            })
            .collect()
    }
}

/// Encode roles the way [`JwtClaims::decode_roles`] reads them.
fn encode_roles(roles: &[i64]) -> String {
    let joined = roles
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(";");
    format!("{ROLE_DELIMITER}{joined}{ROLE_DELIMITER}")
}

/// Bearer-token authenticator backed by HS512 JWTs.
///
/// The token is read from the `Authorization` header (`Bearer <token>`). A
/// token is accepted when its signature verifies against the shared secret,
/// its `iss` and `aud` equal the configured values, and `nbf <= now <= exp`
/// (within `leeway_secs`).
///
/// ```rust
/// use brrtresolver::security::JwtAuthenticator;
///
/// let auth = JwtAuthenticator::new("secret", "https://issuer.example", "brrtresolver");
/// let token = auth.generate_token(7, [1, 2]).unwrap();
/// let identity = auth.verify_token(&token).unwrap();
/// assert_eq!(identity.user_id, 7);
/// assert_eq!(identity.roles, vec![1, 2]);
/// ```
#[derive(Clone)]
pub struct JwtAuthenticator {
    secret: String,
    issuer: String,
    audience: String,
    leeway_secs: u64,
    expiration_minutes: i64,
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .field("expiration_minutes", &self.expiration_minutes)
            .finish()
    }
}

impl JwtAuthenticator {
    /// Create an authenticator for the given shared secret, issuer and audience.
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_secs: 0,
            expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
        }
    }

    /// Clock skew tolerated on `nbf`/`exp`.
    #[must_use]
    pub fn leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    /// Lifetime of tokens issued by [`generate_token`](Self::generate_token).
    #[must_use]
    pub fn expiration_minutes(mut self, minutes: i64) -> Self {
        self.expiration_minutes = minutes;
        self
    }

    /// Issue a token for `user_id` holding `roles`, valid for the configured lifetime.
    pub fn generate_token<I>(&self, user_id: i64, roles: I) -> Result<String, jsonwebtoken::errors::Error>
    where
        I: IntoIterator,
        I::Item: AsCode,
    {
        self.generate_token_with_expiry(user_id, roles, self.expiration_minutes)
    }

    /// Issue a token valid for `minutes` from now.
    pub fn generate_token_with_expiry<I>(
        &self,
        user_id: i64,
        roles: I,
        minutes: i64,
    ) -> Result<String, jsonwebtoken::errors::Error>
    where
        I: IntoIterator,
        I::Item: AsCode,
    {
        let roles: Vec<i64> = roles.into_iter().map(|r| r.code()).collect();
        let now = jsonwebtoken::get_current_timestamp();
        let claims = JwtClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            nbf: now,
            exp: now.saturating_add_signed(minutes.saturating_mul(60)),
            user_id,
            roles: encode_roles(&roles),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Verify a raw token and return the identity it carries.
    pub fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud"]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = jsonwebtoken::decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            let reason = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => "token expired",
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => "token not yet valid",
                jsonwebtoken::errors::ErrorKind::InvalidSignature => "invalid signature",
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => "invalid issuer",
                jsonwebtoken::errors::ErrorKind::InvalidAudience => "invalid audience",
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => "unsupported algorithm",
                _ => "decode error",
            };
            AuthError::InvalidToken(reason.to_string())
        })?;

        let roles = data.claims.decode_roles()?;
        debug!(user_id = data.claims.user_id, roles = ?roles, "JWT validation succeeded");
        Ok(Identity {
            user_id: data.claims.user_id,
            roles,
        })
    }

    fn extract_token<'a>(req: &SecurityRequest<'a>) -> Option<&'a str> {
        let header = req.get_header("authorization")?;
        BEARER_REGEX
            .captures(header)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, req: &SecurityRequest<'_>) -> Result<Identity, AuthError> {
        let token = Self::extract_token(req).ok_or(AuthError::MissingCredential)?;
        self.verify_token(token)
    }
}
