/// Session token issuance and validation
///
/// Tokens are HS256-signed JWTs carrying the user id (`sub`) and email. The
/// signing secret is handed to [`JwtKeys::from_secret`] by the caller at
/// startup; nothing in this module reads the environment or holds global state.
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::JwtKeys;
/// use uuid::Uuid;
///
/// let keys = JwtKeys::from_secret("a-long-random-secret-loaded-from-config");
/// let user_id = Uuid::new_v4();
/// let token = keys.issue_token(user_id, "ann@x.com").unwrap();
/// let verified = keys.verify_token(&token).unwrap();
/// assert_eq!(verified.user_id, user_id);
/// ```
use crate::{CredentialError, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifetime of every session token.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Wire claims of a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Email address at issuance time
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Identity recovered from a token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    pub email: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &JWT_ALGORITHM)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for `user_id` that expires one hour from now.
    pub fn issue_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        self.issue_token_at(user_id, email, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_token_at(&self, user_id: Uuid, email: &str, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat,
            exp: iat + ACCESS_TOKEN_TTL_SECS,
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    /// Verify signature, structure and expiry of `token`.
    pub fn verify_token(&self, token: &str) -> Result<VerifiedToken> {
        self.verify_token_at(token, Utc::now())
    }

    /// Verify `token` against the clock value `now`.
    ///
    /// A token is accepted while `now <= exp` and rejected strictly after;
    /// no leeway is applied.
    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        // Expiry is checked below against the supplied clock.
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| CredentialError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        if now.timestamp() > claims.exp {
            return Err(CredentialError::InvalidToken("token expired".to_string()));
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| CredentialError::InvalidToken("malformed subject".to_string()))?;

        Ok(VerifiedToken {
            user_id,
            email: claims.email,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}
