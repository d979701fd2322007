//! Per-attempt retry decisions.
//!
//! Each upstream attempt produces an [`AttemptOutcome`]; [`decide`] turns it
//! into a [`Decision`] that the executor loop carries out.

use std::time::Duration;

use crate::error::Error;
use crate::models::{upstream_error_message, ChatCompletion};
use crate::resilience::backoff::{exponential_delay, jittered_delay};

// == Retry Policy ==
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per request
    pub max_retries: u32,
    /// Deadline for the first attempt
    pub base_timeout: Duration,
    /// Added to the deadline for every further attempt
    pub timeout_increment: Duration,
    /// Unit of the exponential backoff
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_timeout: Duration::from_secs(30),
            timeout_increment: Duration::from_secs(10),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Builders ==
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_timeouts(mut self, base: Duration, increment: Duration) -> Self {
        self.base_timeout = base;
        self.timeout_increment = increment;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    // == Attempt Timeout ==
    /// Deadline for a zero-based attempt number.
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        self.base_timeout
            .saturating_add(self.timeout_increment.saturating_mul(attempt))
    }

    // == Is Final ==
    pub fn is_final(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_retries
    }
}

// == Attempt Outcome ==
/// What a single upstream attempt produced.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// HTTP 200 with a parseable body
    Success(ChatCompletion),
    /// HTTP 200 with a body that is not a chat completion
    Malformed(String),
    /// Any other status, with the raw body
    Status { status: u16, body: String },
    Network(String),
    Timeout,
}

// == Decision ==
/// What the executor should do next.
#[derive(Debug)]
pub enum Decision {
    Success(ChatCompletion),
    Retry { delay: Duration },
    Fail { error: Error, record_failure: bool },
}

// == Decide ==
/// Classifies one attempt.
///
/// 429 backs off with jitter and never counts against the breaker. 5xx,
/// network errors and timeouts back off and are retried, failing only on the
/// final attempt. Other statuses fail immediately.
pub fn decide(attempt: u32, outcome: AttemptOutcome, policy: &RetryPolicy) -> Decision {
    let last = policy.is_final(attempt);
    let backoff = || exponential_delay(attempt, policy.backoff_base, policy.backoff_cap);

    match outcome {
        AttemptOutcome::Success(completion) => Decision::Success(completion),
        AttemptOutcome::Malformed(reason) => Decision::Fail {
            error: Error::InvalidResponse(reason),
            record_failure: true,
        },
        AttemptOutcome::Status { status: 429, .. } if last => Decision::Fail {
            error: Error::RetriesExhausted {
                attempts: policy.max_retries,
            },
            record_failure: false,
        },
        AttemptOutcome::Status { status: 429, .. } => Decision::Retry {
            delay: jittered_delay(attempt, policy.backoff_base, policy.backoff_cap),
        },
        AttemptOutcome::Status { status, body } if status >= 500 => {
            if last {
                Decision::Fail {
                    error: Error::Upstream {
                        status,
                        message: upstream_error_message(status, &body),
                    },
                    record_failure: true,
                }
            } else {
                Decision::Retry { delay: backoff() }
            }
        }
        AttemptOutcome::Status { status, body } => Decision::Fail {
            error: Error::Upstream {
                status,
                message: upstream_error_message(status, &body),
            },
            record_failure: true,
        },
        AttemptOutcome::Network(reason) => {
            if last {
                Decision::Fail {
                    error: Error::Network(reason),
                    record_failure: true,
                }
            } else {
                Decision::Retry { delay: backoff() }
            }
        }
        AttemptOutcome::Timeout => {
            if last {
                Decision::Fail {
                    error: Error::Timeout {
                        attempt: attempt + 1,
                        timeout: policy.attempt_timeout(attempt),
                    },
                    record_failure: true,
                }
            } else {
                Decision::Retry { delay: backoff() }
            }
        }
    }
}
