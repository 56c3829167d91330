/// Unified error types for the events board
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("{0}")]
    Authentication(String),

    /// Authorization errors
    #[error("{0}")]
    Authorization(String),

    /// Validation errors
    #[error("{0}")]
    Validation(String),

    /// Not found errors
    #[error("{0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate email)
    #[error("{0}")]
    Conflict(String),

    /// Stored data failed an integrity check
    #[error("Data integrity error: {0}")]
    Integrity(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response body: `{ "error": "<message>" }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert ApiError to an HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Authentication(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Authorization(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Database(_)
            | ApiError::Integrity(_)
            | ApiError::Internal(_)
            | ApiError::Io(_) => {
                tracing::error!("internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    // Don't leak details
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse { error: message });

        (status, body).into_response()
    }
}

/// Result type alias for board operations
pub type ApiResult<T> = Result<T, ApiError>;
