//! Resilience Module
//!
//! Admission control, fault isolation and bounded concurrency for upstream calls.

pub mod backoff;
mod circuit_breaker;
mod concurrency;
mod rate_limiter;

pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use concurrency::{ConcurrencyLimiter, ConcurrencyPermit};
pub use rate_limiter::{RateDecision, RateLimiter};
