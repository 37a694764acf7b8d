//! Integration tests for JWT authentication
//!
//! # Test Coverage
//!
//! - token issue/verify with the configured issuer, audience and secret
//! - rejection of expired, foreign and malformed tokens
//! - role checks through `Authenticator::require_auth`
//! - `Authorization` header parsing
//!
//! # Test Strategy
//!
//! Tokens are minted with [`JwtAuthenticator::generate_token`] or encoded by
//! hand with `jsonwebtoken` when a test needs claims the authenticator would
//! never issue.

mod common;

use brrtresolver::security::{AuthError, Authenticator, JwtAuthenticator, JwtClaims};
use brrtresolver::server::Request;
use common::fixtures::{authenticator, bearer, token, TEST_AUDIENCE, TEST_ISSUER, TEST_SECRET};
use jsonwebtoken::{Algorithm, EncodingKey, Header};

fn claims(exp_offset: i64) -> JwtClaims {
    let now = jsonwebtoken::get_current_timestamp();
    JwtClaims {
        iss: TEST_ISSUER.to_string(),
        aud: TEST_AUDIENCE.to_string(),
        iat: now,
        nbf: now.saturating_sub(120),
        exp: now.saturating_add_signed(exp_offset),
        user_id: 11,
        roles: ";1;5;".to_string(),
    }
}

fn sign(claims: &JwtClaims, alg: Algorithm, secret: &str) -> String {
    jsonwebtoken::encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .unwrap()
}

#[test]
fn test_round_trip_identity() {
    let identity = authenticator().verify_token(&token(7, &[1, 2])).unwrap();
    assert_eq!(identity.user_id, 7);
    assert_eq!(identity.roles, vec![1, 2]);
}

#[test]
fn test_hand_signed_claims_accepted() {
    let token = sign(&claims(600), Algorithm::HS512, TEST_SECRET);
    let identity = authenticator().verify_token(&token).unwrap();
    assert_eq!(identity.user_id, 11);
    assert_eq!(identity.roles, vec![1, 5]);
}

#[test]
fn test_expired_token_rejected() {
    let token = sign(&claims(-600), Algorithm::HS512, TEST_SECRET);
    assert_eq!(
        authenticator().verify_token(&token),
        Err(AuthError::InvalidToken("token expired".into()))
    );
}

#[test]
fn test_leeway_tolerates_recent_expiry() {
    let token = sign(&claims(-5), Algorithm::HS512, TEST_SECRET);
    assert!(authenticator().leeway(60).verify_token(&token).is_ok());
}

#[test]
fn test_wrong_secret_rejected() {
    let token = sign(&claims(600), Algorithm::HS512, "someone-else");
    assert_eq!(
        authenticator().verify_token(&token),
        Err(AuthError::InvalidToken("invalid signature".into()))
    );
}

#[test]
fn test_other_algorithm_rejected() {
    let token = sign(&claims(600), Algorithm::HS256, TEST_SECRET);
    assert!(authenticator().verify_token(&token).is_err());
}

#[test]
fn test_foreign_issuer_and_audience_rejected() {
    let other_issuer = JwtAuthenticator::new(TEST_SECRET, "https://elsewhere", TEST_AUDIENCE);
    let other_audience = JwtAuthenticator::new(TEST_SECRET, TEST_ISSUER, "another-app");
    let token = token(1, &[1]);

    assert_eq!(
        other_issuer.verify_token(&token),
        Err(AuthError::InvalidToken("invalid issuer".into()))
    );
    assert_eq!(
        other_audience.verify_token(&token),
        Err(AuthError::InvalidToken("invalid audience".into()))
    );
}

#[test]
fn test_garbage_token_rejected() {
    assert!(authenticator().verify_token("not.a.jwt").is_err());
    assert!(authenticator().verify_token("").is_err());
}

#[test]
fn test_missing_or_non_bearer_header() {
    let auth = authenticator();
    let anonymous = Request::get("/me");
    assert_eq!(
        auth.authenticate(&anonymous.security()),
        Err(AuthError::MissingCredential)
    );

    let basic = Request::get("/me").with_header("Authorization", "Basic dXNlcjpwYXNz");
    assert_eq!(auth.authenticate(&basic.security()), Err(AuthError::MissingCredential));
    assert_eq!(auth.identify(&basic.security()), None);
}

#[test]
fn test_header_name_is_case_insensitive() {
    let req = Request::get("/me").with_header("authorization", bearer(&token(3, &[])));
    assert_eq!(authenticator().authenticate(&req.security()).unwrap().user_id, 3);
}

#[test]
fn test_require_auth_checks_every_role() {
    let auth = authenticator();
    let req = Request::get("/x").with_header("Authorization", bearer(&token(4, &[1, 5])));

    assert!(auth.require_auth(&req.security(), &[]).is_ok());
    assert!(auth.require_auth(&req.security(), &[5]).is_ok());
    assert!(auth.require_auth(&req.security(), &[1, 5]).is_ok());
    assert!(matches!(
        auth.require_auth(&req.security(), &[1, 2]),
        Err(AuthError::InsufficientRoles { .. })
    ));
}

#[test]
fn test_short_lived_token_expires() {
    let auth = authenticator();
    let token = auth.generate_token_with_expiry(9, [1], -1).unwrap();
    assert!(auth.verify_token(&token).is_err());
}
