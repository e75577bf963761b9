//! Purchase Error Types
//!
//! This module provides purchase-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::domain::verifier::VerifyError;

/// Purchase-specific result type alias
pub type PurchaseResult<T> = Result<T, PurchaseError>;

/// Purchase-specific error variants
///
/// These are domain-specific errors that map to appropriate HTTP status
/// codes and can be converted to `AppError` for unified error handling.
/// Per-item conditions (unknown product ids) are not errors: they are
/// absorbed into the purchase summary.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// Receipt is malformed, unsigned or rejected by the provider.
    /// Not retryable as-is; the client must obtain a new receipt.
    #[error("Invalid receipt: {0}")]
    InvalidReceipt(String),

    /// Verification provider could not be reached. Transient.
    #[error("Receipt verification unavailable: {0}")]
    ProviderUnavailable(String),

    /// The caller-supplied deadline expired before verification finished
    #[error("Deadline exceeded while verifying receipt")]
    DeadlineExceeded,

    /// Missing or invalid access token
    #[error("Missing or invalid access token")]
    Unauthorized,

    /// Database error. The whole call rolled back, safe to retry.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PurchaseError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PurchaseError::InvalidReceipt(_) => StatusCode::BAD_REQUEST,
            PurchaseError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PurchaseError::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            PurchaseError::Unauthorized => StatusCode::UNAUTHORIZED,
            PurchaseError::Database(_) | PurchaseError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PurchaseError::InvalidReceipt(_) => ErrorKind::BadRequest,
            PurchaseError::ProviderUnavailable(_) => ErrorKind::ServiceUnavailable,
            PurchaseError::DeadlineExceeded => ErrorKind::RequestTimeout,
            PurchaseError::Unauthorized => ErrorKind::Unauthorized,
            PurchaseError::Database(_) | PurchaseError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            PurchaseError::Database(e) => {
                tracing::error!(error = %e, "Purchase database error");
            }
            PurchaseError::Internal(msg) => {
                tracing::error!(message = %msg, "Purchase internal error");
            }
            PurchaseError::ProviderUnavailable(msg) => {
                tracing::warn!(message = %msg, "Receipt verification provider unavailable");
            }
            PurchaseError::DeadlineExceeded => {
                tracing::warn!("Receipt verification deadline exceeded");
            }
            PurchaseError::InvalidReceipt(msg) => {
                tracing::warn!(message = %msg, "Invalid receipt submitted");
            }
            PurchaseError::Unauthorized => {
                tracing::debug!("Unauthorized purchase request");
            }
        }
    }
}

impl From<VerifyError> for PurchaseError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InvalidReceipt(msg) => PurchaseError::InvalidReceipt(msg),
            VerifyError::ProviderUnavailable(msg) => PurchaseError::ProviderUnavailable(msg),
        }
    }
}

impl From<PurchaseError> for AppError {
    fn from(err: PurchaseError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        AppError::new(kind, message)
    }
}

impl IntoResponse for PurchaseError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        // Server errors get a generic message (don't leak details)
        let message = if status.is_server_error() {
            self.kind().as_str().to_string()
        } else {
            self.to_string()
        };
        let body = serde_json::json!({
            "status": "error",
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
