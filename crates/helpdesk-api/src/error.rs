//! API error types and JSON error response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use helpdesk_agent::AgentError;
use helpdesk_core::error::HelpdeskError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. "bad_request", "not_found").
    pub error: String,
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 - missing or invalid input.
    BadRequest(String),
    /// 404 - resource does not exist.
    NotFound(String),
    /// 500 - unexpected server error.
    Internal(String),
    /// 502 - the language model provider failed.
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "model_unavailable", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<HelpdeskError> for ApiError {
    fn from(err: HelpdeskError) -> Self {
        match &err {
            HelpdeskError::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            HelpdeskError::NotFound(msg) => ApiError::NotFound(msg.clone()),
            HelpdeskError::Model(msg) => ApiError::BadGateway(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::EmptyMessage | AgentError::MessageTooLong(_) => {
                ApiError::BadRequest(err.to_string())
            }
            AgentError::Model(_) => ApiError::BadGateway(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
