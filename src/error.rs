//! Error types for the resilience layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Error Enum ==
/// Unified error type for every failure the layer can surface.
///
/// Cache misses are not errors; they surface as `None` from the cache.
#[derive(Error, Debug)]
pub enum Error {
    /// Admission denied by the sliding-window limiter
    #[error("Rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Circuit breaker is open, no upstream call was attempted
    #[error("Service temporarily unavailable: circuit breaker is open")]
    CircuitOpen,

    /// Upstream answered with a non-success status
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure talking to the upstream
    #[error("Network error: {0}")]
    Network(String),

    /// A single attempt exceeded its deadline
    #[error("Upstream timed out after {}s on attempt {attempt}", .timeout.as_secs())]
    Timeout { attempt: u32, timeout: Duration },

    /// Every attempt ended without a decisive result
    #[error("Upstream unavailable after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Upstream returned 200 with a body we could not use
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Concurrency limiter was closed during shutdown
    #[error("Service is shutting down")]
    Shutdown,
}

impl Error {
    // == Status Mapping ==
    /// Transport status a caller should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Error::Network(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::RetriesExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();

        if let Error::RateLimited { retry_after } = &self {
            // Round up so clients never retry inside the window
            let secs = retry_after
                .as_secs()
                .saturating_add(u64::from(retry_after.subsec_nanos() > 0));
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the resilience layer.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::RateLimited { retry_after: Duration::from_secs(3) }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(Error::CircuitOpen.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            Error::Upstream { status: 500, message: "boom".into() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::Timeout { attempt: 1, timeout: Duration::from_secs(30) }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after_header() {
        let response = Error::RateLimited {
            retry_after: Duration::from_millis(2500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "3");
    }

    #[test]
    fn test_retry_after_header_saturates() {
        let response = Error::RateLimited {
            retry_after: Duration::MAX,
        }
        .into_response();

        assert_eq!(response.headers()["retry-after"], u64::MAX.to_string().as_str());
    }

    #[test]
    fn test_upstream_message_is_displayed() {
        let err = Error::Upstream {
            status: 401,
            message: "Invalid API Key".into(),
        };
        assert_eq!(err.to_string(), "Upstream error 401: Invalid API Key");
    }
}
