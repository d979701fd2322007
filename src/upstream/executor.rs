//! Resilient request executor.
//!
//! Checks the circuit breaker, takes a concurrency permit, then drives the
//! retry loop against the chat-completion endpoint.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{ChatCompletion, ChatPayload};
use crate::resilience::{CircuitBreaker, ConcurrencyLimiter};
use crate::upstream::retry::{decide, AttemptOutcome, Decision, RetryPolicy};

// == Upstream Target ==
/// Where and how to reach the upstream.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub endpoint: String,
    pub api_key: String,
    /// Idle connections kept per host
    pub pool_max_idle: usize,
}

// == Executor ==
pub struct Executor {
    client: Client,
    target: UpstreamTarget,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    limiter: ConcurrencyLimiter,
}

impl Executor {
    // == Constructor ==
    pub fn new(
        target: UpstreamTarget,
        policy: RetryPolicy,
        breaker: Arc<CircuitBreaker>,
        limiter: ConcurrencyLimiter,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(target.pool_max_idle)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            target,
            policy,
            breaker,
            limiter,
        })
    }

    // == Execute ==
    /// Runs one logical request through breaker, permit and retries.
    pub async fn execute(&self, payload: &ChatPayload) -> Result<ChatCompletion> {
        if !self.breaker.can_execute() {
            warn!("Circuit breaker open, rejecting upstream call");
            return Err(Error::CircuitOpen);
        }

        // Held across the network call, released on every exit path
        let _permit = self.limiter.acquire().await?;

        for attempt in 0..self.policy.max_retries {
            let outcome = self.attempt(payload, attempt).await;

            match decide(attempt, outcome, &self.policy) {
                Decision::Success(completion) => {
                    self.breaker.record_success();
                    info!(attempt = attempt + 1, "Upstream call succeeded");
                    return Ok(completion);
                }
                Decision::Retry { delay } => {
                    debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying upstream call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Decision::Fail {
                    error,
                    record_failure,
                } => {
                    if record_failure {
                        self.breaker.record_failure();
                    }
                    warn!(attempt = attempt + 1, error = %error, "Upstream call failed");
                    return Err(error);
                }
            }
        }

        Err(Error::RetriesExhausted {
            attempts: self.policy.max_retries,
        })
    }

    /// One attempt with its own deadline.
    async fn attempt(&self, payload: &ChatPayload, attempt: u32) -> AttemptOutcome {
        let timeout = self.policy.attempt_timeout(attempt);
        match tokio::time::timeout(timeout, self.send(payload)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(attempt = attempt + 1, timeout_ms = timeout.as_millis() as u64, "Attempt timed out");
                AttemptOutcome::Timeout
            }
        }
    }

    async fn send(&self, payload: &ChatPayload) -> AttemptOutcome {
        let response = match self
            .client
            .post(&self.target.endpoint)
            .bearer_auth(&self.target.api_key)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return AttemptOutcome::Timeout,
            Err(e) => return AttemptOutcome::Network(e.to_string()),
        };

        let status = response.status().as_u16();
        debug!(status, "Upstream responded");

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return AttemptOutcome::Timeout,
            Err(e) => return AttemptOutcome::Network(e.to_string()),
        };

        if status != 200 {
            return AttemptOutcome::Status { status, body };
        }

        match serde_json::from_str::<ChatCompletion>(&body) {
            Ok(completion) if completion.choices.is_empty() => {
                AttemptOutcome::Malformed("no choices in upstream response".to_string())
            }
            Ok(completion) => AttemptOutcome::Success(completion),
            Err(e) => AttemptOutcome::Malformed(e.to_string()),
        }
    }

    // == Accessors ==
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}
