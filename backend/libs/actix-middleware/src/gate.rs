//! Authorization gate
//!
//! Decides, for one inbound request, whether it carries a valid session
//! token. The decision is a plain value so that every protected entry point
//! consumes the same typed outcome:
//!
//! ```text
//! Unauthenticated -> TokenExtracted -> TokenVerified -> Authenticated
//!        \                 \                 \
//!         `-----------------`-----------------`--> Rejected (403)
//! ```
//!
//! Pre-flight `OPTIONS` requests skip the gate entirely.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::http::{Method, StatusCode};
use crypto_core::JwtKeys;
use uuid::Uuid;

const BEARER_SCHEME: &str = "Bearer";

/// Identity attached to a request that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Why the gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Authorization token missing")]
    MissingToken,

    #[error("Authorization header is not a bearer token")]
    MalformedHeader,

    #[error("Invalid or expired token")]
    InvalidToken,
}

impl Rejection {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }
}

/// Result of running the gate over a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Pre-flight request, let through without inspection.
    Bypass,
    Authenticated(AuthenticatedUser),
    Rejected(Rejection),
}

/// Pull the raw token out of `Authorization: Bearer <token>`. The scheme
/// name is matched case-insensitively.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, Rejection> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(Rejection::MissingToken)?
        .to_str()
        .map_err(|_| Rejection::MalformedHeader)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(Rejection::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(Rejection::MalformedHeader);
    }
    let token = token.trim();

    if token.is_empty() {
        return Err(Rejection::MissingToken);
    }

    Ok(token)
}

/// Run the gate for a request described by its method and headers.
pub fn authorize(method: &Method, headers: &HeaderMap, keys: &JwtKeys) -> GateOutcome {
    if *method == Method::OPTIONS {
        return GateOutcome::Bypass;
    }

    let token = match extract_bearer(headers) {
        Ok(token) => token,
        Err(rejection) => return GateOutcome::Rejected(rejection),
    };

    match keys.verify_token(token) {
        Ok(verified) => GateOutcome::Authenticated(AuthenticatedUser {
            user_id: verified.user_id,
            email: verified.email,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "JWT validation failed");
            GateOutcome::Rejected(Rejection::InvalidToken)
        }
    }
}
