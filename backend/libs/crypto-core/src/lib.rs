//! # Crypto Core
//!
//! Credential primitives shared by Pinpoint services.
//!
//! ## Modules
//! - `password`: Argon2id password hashing and verification
//! - `jwt`: HS256 session tokens with a fixed one hour lifetime
//! - `secret`: strength checks for the HS256 signing secret

pub mod jwt;
pub mod password;
pub mod secret;

pub use jwt::{Claims, JwtKeys, ACCESS_TOKEN_TTL_SECS};
pub use password::{hash_password, verify_password};
pub use secret::{generate_secret, validate_secret_strength, SecretStrength};

/// Errors raised by the credential primitives.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("password verification failed: {0}")]
    Verification(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

pub type Result<T> = std::result::Result<T, CredentialError>;
