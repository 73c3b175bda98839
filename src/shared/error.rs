//! Application Error Types
//!
//! Domain errors raised by the store and tracker, and the HTTP-facing
//! error with Axum integration.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors raised by the chat core (store, tracker, repositories).
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),
}

impl ChatError {
    /// Stable machine-readable code, shared by HTTP bodies and gateway frames.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "VALIDATION_ERROR",
            ChatError::UnknownParticipant(_) => "UNKNOWN_PARTICIPANT",
            ChatError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Whether the failed operation may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::StorageUnavailable(_))
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(message) => AppError::Validation {
                message,
                errors: Vec::new(),
            },
            ChatError::UnknownParticipant(identity) => {
                AppError::NotFound(format!("Unknown participant: {}", identity))
            }
            ChatError::StorageUnavailable(e) => AppError::Unavailable(e.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, errors) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg, None),
            AppError::Validation { message, errors } => (
                StatusCode::BAD_REQUEST,
                10007,
                message,
                Some(errors).filter(|e| !e.is_empty()),
            ),
            AppError::Unavailable(msg) => {
                tracing::warn!("Storage unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    10008,
                    "Storage temporarily unavailable".into(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            code,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}
