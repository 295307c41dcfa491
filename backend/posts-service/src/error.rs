/// Error types for Posts Service
///
/// Every failure that crosses an operation boundary is one of the variants
/// below. Lower-level errors (store, credentials, geocoding, files) are logged
/// where they are converted and never reach API clients verbatim.
use crate::db::StoreError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use crypto_core::CredentialError;
use thiserror::Error;

/// Result type for posts-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Message used whenever an internal failure is reported to a client.
pub const GENERIC_FAILURE: &str = "Something went wrong, please try again later.";

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input, rejected before any operation runs
    #[error("{0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Identity does not own the resource, or the credential is wrong
    #[error("{0}")]
    Forbidden(String),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// Session token missing, malformed or expired
    #[error("{0}")]
    InvalidToken(String),

    /// Storage, transaction, hashing or collaborator failure
    #[error("{0}")]
    OperationFailed(String),
}

impl AppError {
    pub fn operation_failed(msg: impl Into<String>) -> Self {
        AppError::OperationFailed(msg.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidToken(_) => StatusCode::FORBIDDEN,
            AppError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store operation failed");
        AppError::OperationFailed(GENERIC_FAILURE.to_string())
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidToken(reason) => {
                tracing::debug!(%reason, "token rejected");
                AppError::InvalidToken("Invalid or expired token.".to_string())
            }
            other => {
                tracing::error!(error = %other, "credential operation failed");
                AppError::OperationFailed(GENERIC_FAILURE.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Invalid inputs passed: {}", err))
    }
}

impl From<actix_web::error::JsonPayloadError> for AppError {
    fn from(err: actix_web::error::JsonPayloadError) -> Self {
        AppError::Validation(format!("Invalid request body: {}", err))
    }
}

impl From<actix_web::error::PathError> for AppError {
    fn from(err: actix_web::error::PathError) -> Self {
        AppError::NotFound(format!("Invalid identifier: {}", err))
    }
}
