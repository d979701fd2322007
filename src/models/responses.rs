//! Response DTOs for the HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::gateway::Generated;
use crate::resilience::BreakerState;

/// Response body for POST /generate
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub reply: String,
    /// True when served from cache
    pub cached: bool,
}

impl From<Generated> for GenerateResponse {
    fn from(generated: Generated) -> Self {
        Self {
            reply: generated.reply,
            cached: generated.cached,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current circuit breaker state
    pub upstream: BreakerState,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Reports "degraded" while the breaker is not closed.
    pub fn from_breaker(state: BreakerState) -> Self {
        let status = match state {
            BreakerState::Closed => "healthy",
            BreakerState::Open | BreakerState::HalfOpen => "degraded",
        };
        Self {
            status: status.to_string(),
            upstream: state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
