//! Three-state circuit breaker guarding the upstream service.
//!
//! Closed -> Open once `failure_threshold` failures accumulate.
//! Open -> HalfOpen on the first `can_execute()` after `timeout` has passed
//! since the last failure. HalfOpen -> Closed after `success_threshold`
//! successes, HalfOpen -> Open on any failure.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

// == Breaker State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

// == Breaker Config ==
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    /// How long the breaker stays open after the last failure
    pub timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(60),
        }
    }
}

impl BreakerConfig {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Builders ==
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// == Breaker Snapshot ==
/// Point-in-time view of the breaker for stats endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub state_changes: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    total_requests: u64,
    failed_requests: u64,
    state_changes: u64,
}

impl Inner {
    fn transition(&mut self, to: BreakerState) {
        let from = self.state;
        self.state = to;
        self.state_changes += 1;
        match to {
            BreakerState::Open => warn!(?from, failures = self.failure_count, "Circuit breaker opened"),
            BreakerState::HalfOpen => info!(?from, "Circuit breaker half-open, probing upstream"),
            BreakerState::Closed => info!(?from, "Circuit breaker closed"),
        }
    }
}

// == Circuit Breaker ==
/// Fault isolator shared by every request path.
///
/// State lives behind one mutex, so reads and transitions are linearizable.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    // == Constructor ==
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure: None,
                last_failure_at: None,
                total_requests: 0,
                failed_requests: 0,
                state_changes: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Can Execute ==
    /// Whether a call may proceed. Counts every invocation as a request.
    ///
    /// In Open, the first call after the timeout moves to HalfOpen and is
    /// admitted as the trial call.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        inner.total_requests += 1;

        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let cooled_down = inner
                    .last_failure
                    .map_or(true, |at| at.elapsed() > self.config.timeout);
                if cooled_down {
                    inner.success_count = 0;
                    inner.transition(BreakerState::HalfOpen);
                }
                cooled_down
            }
        }
    }

    // == Record Success ==
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => {
                // Healthy traffic slowly forgives earlier failures
                inner.failure_count = inner.failure_count.saturating_sub(1);
            }
            BreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.transition(BreakerState::Closed);
                }
            }
            BreakerState::Open => {}
        }
    }

    // == Record Failure ==
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failed_requests += 1;
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());
        inner.last_failure_at = Some(Utc::now());

        match inner.state {
            BreakerState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.transition(BreakerState::Open);
                }
            }
            BreakerState::HalfOpen => {
                inner.success_count = 0;
                inner.transition(BreakerState::Open);
            }
            BreakerState::Open => {}
        }
    }

    // == State ==
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    // == Stats ==
    pub fn stats(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_requests: inner.total_requests,
            failed_requests: inner.failed_requests,
            state_changes: inner.state_changes,
            last_failure_at: inner.last_failure_at,
        }
    }

    // == Config ==
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
