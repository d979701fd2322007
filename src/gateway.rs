//! Request-scope context tying cache, rate limiter and executor together.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{self, CacheKey, CacheStats, CacheStore, SharedCache};
use crate::config::Config;
use crate::error::Result;
use crate::models::{ChatMessage, ChatPayload};
use crate::resilience::{BreakerSnapshot, CircuitBreaker, ConcurrencyLimiter, RateLimiter};
use crate::upstream::Executor;

// == Generation Defaults ==
/// Generation parameters applied when a caller does not override them.
#[derive(Debug, Clone)]
pub struct GenerationDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

// == Generated ==
/// Result of [`Gateway::generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub reply: String,
    /// True when served from cache without an upstream call
    pub cached: bool,
}

// == Concurrency Stats ==
#[derive(Debug, Clone, Serialize)]
pub struct ConcurrencyStats {
    pub max_concurrent: usize,
    pub in_flight: usize,
    pub available: usize,
}

// == Gateway Stats ==
/// Aggregated view for stats endpoints. Reading it has no side effects.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStats {
    pub cache: CacheStats,
    pub cache_hit_rate: f64,
    pub breaker: BreakerSnapshot,
    pub concurrency: ConcurrencyStats,
    pub rate_limited_clients: usize,
}

// == Gateway ==
/// Long-lived handles built once at startup and shared by every request.
#[derive(Clone)]
pub struct Gateway {
    cache: SharedCache<String>,
    rate_limiter: Arc<RateLimiter>,
    executor: Arc<Executor>,
    rate_limit: usize,
    rate_window: Duration,
    defaults: GenerationDefaults,
}

impl Gateway {
    // == Constructor ==
    pub fn new(
        cache: SharedCache<String>,
        rate_limiter: Arc<RateLimiter>,
        executor: Executor,
        rate_limit: usize,
        rate_window: Duration,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            cache,
            rate_limiter,
            executor: Arc::new(executor),
            rate_limit,
            rate_window,
            defaults,
        }
    }

    // == From Config ==
    /// Builds every component from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = CacheStore::new(config.cache_max_entries, config.cache_ttl())
            .with_sweep_interval(config.cleanup_interval());
        let breaker = Arc::new(CircuitBreaker::new(config.breaker_config()));
        let limiter = ConcurrencyLimiter::new(config.max_concurrent());
        let executor = Executor::new(
            config.upstream_target(),
            config.retry_policy(),
            breaker,
            limiter,
        )?;

        Ok(Self::new(
            cache::shared(store),
            Arc::new(RateLimiter::new()),
            executor,
            config.rate_limit,
            config.rate_window(),
            GenerationDefaults {
                model: config.model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
        ))
    }

    // == Generate ==
    /// Cache lookup, admission, upstream call, cache fill.
    ///
    /// A cache hit returns without consulting the rate limiter or the
    /// upstream. Only successful replies are cached.
    pub async fn generate(
        &self,
        client_id: &str,
        cache_key: &CacheKey,
        payload: &ChatPayload,
    ) -> Result<Generated> {
        let cached = self.cache.write().await.get(cache_key.as_str());
        if let Some(reply) = cached {
            debug!(key = %cache_key, "Cache hit");
            return Ok(Generated {
                reply,
                cached: true,
            });
        }

        self.rate_limiter
            .check(client_id, self.rate_limit, self.rate_window)?;

        let completion = self.executor.execute(payload).await?;
        let reply = completion.reply()?;

        self.cache
            .write()
            .await
            .set(cache_key.as_str().to_string(), reply.clone(), None);
        info!(key = %cache_key, chars = reply.len(), "Generated and cached reply");

        Ok(Generated {
            reply,
            cached: false,
        })
    }

    // == Payload ==
    /// Payload from messages using the configured generation defaults.
    pub fn payload(&self, messages: Vec<ChatMessage>) -> ChatPayload {
        ChatPayload {
            messages,
            model: self.defaults.model.clone(),
            temperature: self.defaults.temperature,
            max_tokens: self.defaults.max_tokens,
        }
    }

    // == Stats ==
    pub async fn stats(&self) -> GatewayStats {
        let cache = self.cache.read().await.stats();
        let limiter = self.executor.limiter();
        GatewayStats {
            cache_hit_rate: cache.hit_rate(),
            cache,
            breaker: self.executor.breaker().stats(),
            concurrency: ConcurrencyStats {
                max_concurrent: limiter.max_concurrent(),
                in_flight: limiter.in_flight(),
                available: limiter.available_permits(),
            },
            rate_limited_clients: self.rate_limiter.tracked_identifiers(),
        }
    }

    // == Accessors ==
    pub fn cache(&self) -> &SharedCache<String> {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        self.executor.breaker()
    }

    pub fn defaults(&self) -> &GenerationDefaults {
        &self.defaults
    }

    // == Close ==
    /// Stops admitting new upstream calls; in-flight calls finish normally.
    pub fn close(&self) {
        self.executor.limiter().close();
    }
}
