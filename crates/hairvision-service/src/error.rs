//! API error types and responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use hairvision_core::CoreError;
use hairvision_store::StoreError;

use crate::ledger::LedgerError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid input. Never worth retrying.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Not enough credits and overage is disabled.
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Credits left this cycle.
        available: i64,
        /// Credits the request needs.
        required: i64,
    },

    /// The circuit breaker is open; no upstream call was made.
    #[error("image generation is temporarily unavailable")]
    CircuitOpen {
        /// Seconds until the breaker closes.
        retry_after_secs: u64,
    },

    /// The upstream image API failed.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// A feature is not configured on this deployment.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::InvalidArgument(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_argument",
                msg.clone(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::InsufficientCredits {
                available,
                required,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "available": available,
                    "required": required
                })),
            ),
            Self::CircuitOpen { retry_after_secs } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "circuit_open",
                self.to_string(),
                Some(serde_json::json!({ "retry_after_secs": retry_after_secs })),
            ),
            Self::UpstreamFailure(msg) => (
                StatusCode::BAD_GATEWAY,
                "upstream_failure",
                msg.clone(),
                None,
            ),
            Self::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::CircuitOpen { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, retry_after_secs.into());
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            LedgerError::Store(err) => err.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
