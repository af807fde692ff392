use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Covers both unresolved tokens/teams and resources owned by someone
    /// else; the two collapse to one response to avoid existence leaks.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Stale selection: {0}")]
    StaleSelection(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "internal",
            AppError::NotFound(_) => "not_found",
            AppError::Expired(_) => "expired",
            AppError::InvalidState(_) => "invalid_state",
            AppError::StaleSelection(_) => "stale_selection",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Validation(_) => "validation",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(err) => {
                tracing::error!("Persistence failure: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                )
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                )
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
            AppError::Expired(_) => (StatusCode::GONE, "This scheduling request has expired"),
            AppError::InvalidState(_) => (
                StatusCode::CONFLICT,
                "Action not permitted in the request's current state",
            ),
            AppError::StaleSelection(_) => (
                StatusCode::CONFLICT,
                "Selected slot is no longer available",
            ),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation error"),
        };

        // Never echo persistence internals back to the caller.
        let details = match &self {
            AppError::Database(_) | AppError::Internal(_) => message.to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": message,
                "details": details,
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
