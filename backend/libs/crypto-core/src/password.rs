/// Password hashing and verification using Argon2id
use crate::{CredentialError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id with a random per-password salt.
///
/// Returns a PHC-formatted string safe for database storage. Strength rules
/// are enforced at the request boundary, not here.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Verify a password against its stored hash.
///
/// A mismatch is `Ok(false)`; only an unparsable hash or an internal Argon2
/// failure is an error.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| CredentialError::Verification(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Verification(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret1").expect("should hash password");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash).expect("should verify"));
    }

    #[test]
    fn test_verify_wrong_password_is_false_not_error() {
        let hash = hash_password("secret1").expect("should hash password");
        assert!(!verify_password("secret2", &hash).expect("mismatch is not an error"));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let first = hash_password("secret1").unwrap();
        let second = hash_password("secret1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        let result = verify_password("secret1", "not-a-phc-string");
        assert!(matches!(result, Err(CredentialError::Verification(_))));
    }
}
