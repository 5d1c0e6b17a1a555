pub mod handlers;
pub mod messages;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Standard error response structure.
///
/// Returned for all error responses so clients see a consistent shape:
/// - `error`: machine-readable error identifier (e.g. "Conflict")
/// - `message`: human-readable error message
/// - `details`: optional structured details (e.g. validation field errors)
/// - `code`: optional integer code for logging/monitoring
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error identifier for programmatic handling
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional structured error details (e.g. validation field errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Integer error code for logging and monitoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

/// Generic application error that converts to an HTTP response.
///
/// Domain crates carry their own richer error enums; this type covers the
/// cross-cutting cases raised by shared extractors and handlers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message, code) = match self {
            AppError::BadRequest(msg) => {
                tracing::info!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg, messages::CODE_BAD_REQUEST)
            }
            AppError::NotFound(msg) => {
                tracing::info!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, "NotFound", msg, messages::CODE_NOT_FOUND)
            }
            AppError::Conflict(msg) => {
                tracing::info!("Conflict: {}", msg);
                (StatusCode::CONFLICT, "Conflict", msg, messages::CODE_CONFLICT)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    messages::INTERNAL_ERROR.to_string(),
                    messages::CODE_INTERNAL,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            details: None,
            code: Some(code),
        });

        (status, body).into_response()
    }
}
