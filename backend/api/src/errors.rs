//! Application-wide error types.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use thiserror::Error;
use tracing::error;

use crate::models::FranchiseStatus;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("operation not permitted while franchise status is {status}")]
    InvalidStatus { status: FranchiseStatus },

    #[error("insufficient shares: only {remaining} remaining")]
    InsufficientShares { remaining: i64 },

    #[error("price mismatch: current cost per share is {expected}")]
    PriceMismatch { expected: f64 },

    #[error("caller is not permitted to perform this operation")]
    Forbidden,

    #[error("storage conflict, please retry")]
    StorageConflict,

    #[error("payment verifier error: {0}")]
    Verifier(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

// SQLite primary result codes for busy/locked, plus the extended busy codes.
const SQLITE_BUSY_CODES: [&str; 4] = ["5", "6", "261", "517"];

impl ApiError {
    /// Convert an sqlx error, mapping SQLite busy/locked conditions to the
    /// retryable [`ApiError::StorageConflict`] variant.
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            if let Some(code) = db.code() {
                if SQLITE_BUSY_CODES.contains(&code.as_ref()) {
                    return ApiError::StorageConflict;
                }
            }
        }
        ApiError::Database(e)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidStatus { .. }
            | ApiError::InsufficientShares { .. }
            | ApiError::PriceMismatch { .. } => StatusCode::CONFLICT,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::StorageConflict => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Verifier(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) | ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal failures are logged in full but reported generically —
        // storage internals must not reach the caller.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {self}");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}
