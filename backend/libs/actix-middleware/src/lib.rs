//! # Actix Middleware Library
//!
//! Authorization gate for Pinpoint Actix services
//!
//! ## Modules
//! - `gate`: the explicit, typed authorization decision
//! - `jwt_auth`: Actix middleware and extractors built on the gate

pub mod gate;
pub mod jwt_auth;

pub use gate::{authorize, extract_bearer, AuthenticatedUser, GateOutcome, Rejection};
pub use jwt_auth::{GateError, JwtAuthMiddleware, UserId};
