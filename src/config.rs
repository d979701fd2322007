//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::resilience::BreakerConfig;
use crate::upstream::{RetryPolicy, UpstreamTarget};

/// Default chat-completion endpoint
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Durations are whole seconds.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the upstream
    pub api_key: String,
    /// Chat-completion endpoint URL
    pub upstream_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Maximum number of cached replies
    pub cache_max_entries: usize,
    /// TTL for cached replies
    pub cache_ttl: u64,
    /// Background cleanup interval for cache and rate windows
    pub cleanup_interval: u64,
    /// Requests admitted per client per window
    pub rate_limit: usize,
    pub rate_window: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_success_threshold: u32,
    pub breaker_timeout: u64,
    /// Simultaneous upstream calls
    pub max_concurrent: usize,
    /// Attempts per upstream request
    pub max_retries: u32,
    /// First-attempt deadline
    pub request_timeout: u64,
    /// Deadline added per further attempt
    pub timeout_increment: u64,
    pub backoff_cap: u64,
    /// Idle upstream connections kept per host
    pub pool_max_idle: usize,
    pub server_port: u16,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `GROQ_API_KEY` - Upstream bearer token (default: empty)
    /// - `UPSTREAM_URL` - Chat-completion endpoint (default: Groq)
    /// - `MODEL`, `TEMPERATURE`, `MAX_TOKENS` - Generation parameters
    /// - `CACHE_MAX_ENTRIES` (1000), `CACHE_TTL` (3600), `CLEANUP_INTERVAL` (60)
    /// - `RATE_LIMIT` (10), `RATE_WINDOW` (60)
    /// - `BREAKER_FAILURE_THRESHOLD` (5), `BREAKER_SUCCESS_THRESHOLD` (3), `BREAKER_TIMEOUT` (60)
    /// - `MAX_CONCURRENT` (10), `MAX_RETRIES` (3)
    /// - `REQUEST_TIMEOUT` (30), `TIMEOUT_INCREMENT` (10), `BACKOFF_CAP` (10)
    /// - `POOL_MAX_IDLE` (10), `SERVER_PORT` (8000)
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_key: env_or("GROQ_API_KEY", d.api_key),
            upstream_url: env_or("UPSTREAM_URL", d.upstream_url),
            model: env_or("MODEL", d.model),
            temperature: env_or("TEMPERATURE", d.temperature),
            max_tokens: env_or("MAX_TOKENS", d.max_tokens),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", d.cache_max_entries),
            cache_ttl: env_or("CACHE_TTL", d.cache_ttl),
            cleanup_interval: env_or("CLEANUP_INTERVAL", d.cleanup_interval),
            rate_limit: env_or("RATE_LIMIT", d.rate_limit),
            rate_window: env_or("RATE_WINDOW", d.rate_window),
            breaker_failure_threshold: env_or("BREAKER_FAILURE_THRESHOLD", d.breaker_failure_threshold),
            breaker_success_threshold: env_or("BREAKER_SUCCESS_THRESHOLD", d.breaker_success_threshold),
            breaker_timeout: env_or("BREAKER_TIMEOUT", d.breaker_timeout),
            max_concurrent: env_or("MAX_CONCURRENT", d.max_concurrent),
            max_retries: env_or("MAX_RETRIES", d.max_retries),
            request_timeout: env_or("REQUEST_TIMEOUT", d.request_timeout),
            timeout_increment: env_or("TIMEOUT_INCREMENT", d.timeout_increment),
            backoff_cap: env_or("BACKOFF_CAP", d.backoff_cap),
            pool_max_idle: env_or("POOL_MAX_IDLE", d.pool_max_idle),
            server_port: env_or("SERVER_PORT", d.server_port),
        }
    }

    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig::new()
            .with_failure_threshold(self.breaker_failure_threshold)
            .with_success_threshold(self.breaker_success_threshold)
            .with_timeout(Duration::from_secs(self.breaker_timeout))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(self.max_retries)
            .with_timeouts(
                Duration::from_secs(self.request_timeout),
                Duration::from_secs(self.timeout_increment),
            )
            .with_backoff(Duration::from_secs(1), Duration::from_secs(self.backoff_cap))
    }

    pub fn upstream_target(&self) -> UpstreamTarget {
        UpstreamTarget {
            endpoint: self.upstream_url.clone(),
            api_key: self.api_key.clone(),
            pool_max_idle: self.pool_max_idle,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// Simultaneous upstream calls, never zero.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.max(1)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.7,
            max_tokens: 2500,
            cache_max_entries: 1000,
            cache_ttl: 3600,
            cleanup_interval: 60,
            rate_limit: 10,
            rate_window: 60,
            breaker_failure_threshold: 5,
            breaker_success_threshold: 3,
            breaker_timeout: 60,
            max_concurrent: 10,
            max_retries: 3,
            request_timeout: 30,
            timeout_increment: 10,
            backoff_cap: 10,
            pool_max_idle: 10,
            server_port: 8000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.model, "llama3-8b-8192");
        assert_eq!(config.max_tokens, 2500);
        assert_eq!(config.cache_max_entries, 1000);
        assert_eq!(config.rate_limit, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.server_port, 8000);
    }

    #[test]
    fn test_derived_sub_configs() {
        let config = Config::default();

        let breaker = config.breaker_config();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.success_threshold, 3);
        assert_eq!(breaker.timeout, Duration::from_secs(60));

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.attempt_timeout(1), Duration::from_secs(40));
        assert_eq!(policy.backoff_cap, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_intervals_and_limits_are_clamped() {
        let config = Config {
            max_concurrent: 0,
            cleanup_interval: 0,
            ..Config::default()
        };
        assert_eq!(config.max_concurrent(), 1);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_env_overrides() {
        env::set_var("BREAKER_TIMEOUT", "15");
        env::set_var("MAX_CONCURRENT", "not-a-number");

        let config = Config::from_env();
        assert_eq!(config.breaker_timeout, 15);
        assert_eq!(config.max_concurrent, 10, "unparseable values fall back to defaults");

        env::remove_var("BREAKER_TIMEOUT");
        env::remove_var("MAX_CONCURRENT");
    }
}
