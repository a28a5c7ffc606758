use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (missing or malformed input).
    BadRequest(String),
    /// Resource not found error (unknown customer, loan, or score token).
    NotFound(String),
    /// Conflict error (already subscribed, active loan exists).
    Conflict(String),
    /// Unauthorized access error (bad or unknown credential/token).
    Unauthorized(String),
    /// The broker has not completed registration with the scoring service.
    NotRegistered,
    /// A dependency (banking gateway, broker, scoring service) is unreachable or erroring.
    UpstreamUnavailable(String),
    /// A dependency call exceeded its explicit deadline.
    Timeout(String),
    /// Internal server error.
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotRegistered => write!(f, "Service identity not registered"),
            AppError::UpstreamUnavailable(msg) => write!(f, "Upstream unavailable: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Upstream failures are logged with their full message but the response
    /// body never echoes credentials or expected header values.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            AppError::NotRegistered => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service not yet registered".to_string(),
            ),
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Timeout(msg) => {
                tracing::error!("Upstream timeout: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    ///
    /// Deadline overruns become `Timeout`; everything else is an upstream failure.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::UpstreamUnavailable(err.to_string())
        }
    }
}
