//! API error types and JSON error response formatting.
//!
//! `ApiError` covers transport-level faults only. Rejections a user can act
//! on (empty message, wrong file type, busy) are answered with HTTP 200 and
//! a `{"success": false, "message": ...}` body by the handlers instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use docent_chat::ChatError;
use docent_core::error::DocentError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "internal_error").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - unreadable body or invalid header.
    BadRequest(String),
    /// 404 Not Found.
    NotFound(String),
    /// 413 Payload Too Large - request body over the configured limit.
    PayloadTooLarge(String),
    /// 500 Internal Server Error.
    Internal(String),
    /// 503 Service Unavailable - shutting down.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DocentError> for ApiError {
    fn from(err: DocentError) -> Self {
        match &err {
            DocentError::ShuttingDown => ApiError::ServiceUnavailable(err.to_string()),
            DocentError::PayloadTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            DocentError::Upload(msg) => ApiError::BadRequest(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::SessionNotFound(id) => ApiError::NotFound(format!("session not found: {}", id)),
            other if other.is_rejection() => ApiError::BadRequest(other.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
