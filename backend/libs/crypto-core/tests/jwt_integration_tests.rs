/// Integration tests for crypto-core credential primitives
///
/// Covers the token lifecycle across independently constructed key sets and
/// the password hashing contract used by signup and login.
use chrono::{Duration, Utc};
use crypto_core::jwt::JwtKeys;
use crypto_core::{hash_password, verify_password, CredentialError, ACCESS_TOKEN_TTL_SECS};
use uuid::Uuid;

const SECRET: &str = "integration-secret-Qm7#pL2x9Rk4vT8wEz1u";

#[test]
fn test_keys_from_same_secret_interoperate() {
    let issuer = JwtKeys::from_secret(SECRET);
    let verifier = JwtKeys::from_secret(SECRET);

    let user_id = Uuid::new_v4();
    let token = issuer.issue_token(user_id, "ann@x.com").unwrap();
    let verified = verifier.verify_token(&token).unwrap();

    assert_eq!(verified.user_id, user_id);
    assert_eq!(verified.email, "ann@x.com");
}

#[test]
fn test_token_lifetime_is_one_hour() {
    let keys = JwtKeys::from_secret(SECRET);
    let issued = Utc::now() - Duration::minutes(30);
    let token = keys.issue_token_at(Uuid::new_v4(), "ann@x.com", issued).unwrap();

    let verified = keys.verify_token(&token).unwrap();
    assert_eq!(verified.expires_at, issued.timestamp() + ACCESS_TOKEN_TTL_SECS);
}

#[test]
fn test_token_issued_two_hours_ago_is_rejected() {
    let keys = JwtKeys::from_secret(SECRET);
    let issued = Utc::now() - Duration::hours(2);
    let token = keys.issue_token_at(Uuid::new_v4(), "ann@x.com", issued).unwrap();

    match keys.verify_token(&token) {
        Err(CredentialError::InvalidToken(reason)) => assert!(reason.contains("expired")),
        other => panic!("expected expiry rejection, got {:?}", other),
    }
}

#[test]
fn test_tampered_payload_is_rejected() {
    let keys = JwtKeys::from_secret(SECRET);
    let token = keys.issue_token(Uuid::new_v4(), "ann@x.com").unwrap();

    let mut parts: Vec<&str> = token.split('.').collect();
    let forged_payload = keys
        .issue_token(Uuid::new_v4(), "mallory@x.com")
        .unwrap()
        .split('.')
        .nth(1)
        .unwrap()
        .to_string();
    parts[1] = &forged_payload;

    assert!(keys.verify_token(&parts.join(".")).is_err());
}

#[test]
fn test_password_roundtrip_for_login() {
    let hash = hash_password("secret1").unwrap();
    assert!(verify_password("secret1", &hash).unwrap());
    assert!(!verify_password("Secret1", &hash).unwrap());
}
