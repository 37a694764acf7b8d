//! # Configuration Module
//!
//! Application configuration loaded from a YAML file, then overridden by
//! environment variables.
//!
//! ```yaml
//! http:
//!   addr: 0.0.0.0:8080
//!   max_body_bytes: 1048576
//! security:
//!   jwt:
//!     secret: change-me
//!     issuer: https://issuer.example
//!     audience: brrtresolver
//!     expiration_minutes: 30
//!     leeway_secs: 0
//! ```
//!
//! Every section is optional. Without a `security.jwt` section no
//! authenticator is configured and guarded handlers answer 500.
//!
//! ## Environment Variables
//!
//! | Variable | Overrides |
//! |---|---|
//! | `BRRTR_ADDR` | `http.addr` |
//! | `BRRTR_JWT_SECRET` | `security.jwt.secret` |
//! | `BRRTR_JWT_ISSUER` | `security.jwt.issuer` |
//! | `BRRTR_JWT_AUDIENCE` | `security.jwt.audience` |
//! | `BRRTR_JWT_EXPIRATION_MINUTES` | `security.jwt.expiration_minutes` |
//!
//! Setting `BRRTR_JWT_SECRET` alone is enough to enable the JWT
//! authenticator; issuer and audience then keep their defaults.

use crate::security::{JwtAuthenticator, DEFAULT_EXPIRATION_MINUTES};
use crate::server::DEFAULT_MAX_BODY_BYTES;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Default bind address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub security: SecurityConfig,
}

/// `http` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub addr: String,
    /// Longest request body read before the request is rejected.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// `security` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    pub jwt: Option<JwtConfig>,
}

/// `security.jwt` section.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_minutes: i64,
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "brrtresolver".to_string(),
            audience: "brrtresolver".to_string(),
            expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
            leeway_secs: 0,
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiration_minutes", &self.expiration_minutes)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl AppConfig {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse configuration")
    }

    /// Read and parse a YAML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        info!(
            path = %path.display(),
            addr = %config.http.addr,
            jwt_enabled = config.security.jwt.is_some(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Apply `BRRTR_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BRRTR_ADDR") {
            self.http.addr = addr;
        }

        if self.security.jwt.is_none() && lookup("BRRTR_JWT_SECRET").is_none() {
            return Ok(());
        }
        let jwt = self.security.jwt.get_or_insert_with(JwtConfig::default);
        if let Some(secret) = lookup("BRRTR_JWT_SECRET") {
            jwt.secret = secret;
        }
        if let Some(issuer) = lookup("BRRTR_JWT_ISSUER") {
            jwt.issuer = issuer;
        }
        if let Some(audience) = lookup("BRRTR_JWT_AUDIENCE") {
            jwt.audience = audience;
        }
        if let Some(minutes) = lookup("BRRTR_JWT_EXPIRATION_MINUTES") {
            jwt.expiration_minutes = minutes.trim().parse().with_context(|| {
                format!("BRRTR_JWT_EXPIRATION_MINUTES must be an integer, got '{minutes}'")
            })?;
        }
        Ok(())
    }

    /// JWT authenticator for the `security.jwt` section, if present.
    ///
    /// # Errors
    ///
    /// Fails when the section is present but the secret is empty.
    pub fn authenticator(&self) -> Result<Option<JwtAuthenticator>> {
        let Some(jwt) = &self.security.jwt else {
            return Ok(None);
        };
        if jwt.secret.is_empty() {
            anyhow::bail!("security.jwt.secret must not be empty");
        }
        Ok(Some(
            JwtAuthenticator::new(&jwt.secret, &jwt.issuer, &jwt.audience)
                .leeway(jwt.leeway_secs)
                .expiration_minutes(jwt.expiration_minutes),
        ))
    }
}
