//! API error types and JSON error response formatting.
//!
//! Server faults are logged with their real cause and answered with a
//! generic body, so internal error text never reaches clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use newslens_core::error::NewslensError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// Body of a 429, kept to the single field clients match on.
#[derive(Debug, Serialize)]
struct RateLimitBody {
    error: &'static str,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - malformed body or invalid parameters.
    BadRequest(String),
    /// 429 Too Many Requests - the user's request ceiling is spent.
    TooManyRequests,
    /// 500 Internal Server Error. The message is logged, not returned.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: "bad_request".to_string(),
                    message,
                }),
            )
                .into_response(),
            ApiError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitBody {
                    error: "Rate limit exceeded",
                }),
            )
                .into_response(),
            ApiError::Internal(cause) => {
                error!(error = %cause, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "internal_error".to_string(),
                        message: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<NewslensError> for ApiError {
    fn from(err: NewslensError) -> Self {
        match err {
            NewslensError::Validation(msg) => ApiError::BadRequest(msg),
            NewslensError::RateLimited => ApiError::TooManyRequests,
            other => ApiError::Internal(other.to_string()),
        }
    }
}
