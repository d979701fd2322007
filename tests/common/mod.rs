//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use completion_shield::cache::{self, CacheStore};
use completion_shield::gateway::{Gateway, GenerationDefaults};
use completion_shield::models::{ChatMessage, ChatPayload};
use completion_shield::resilience::{BreakerConfig, CircuitBreaker, ConcurrencyLimiter, RateLimiter};
use completion_shield::upstream::{Executor, RetryPolicy, UpstreamTarget};
use tokio::net::TcpListener;

pub const API_KEY: &str = "test-key";
pub const COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";

pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
    })
    .to_string()
}

pub fn error_body(message: &str) -> String {
    serde_json::json!({ "error": { "message": message } }).to_string()
}

/// Three attempts with millisecond backoff so retry tests stay fast.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new()
        .with_max_retries(3)
        .with_timeouts(Duration::from_secs(5), Duration::from_secs(1))
        .with_backoff(Duration::from_millis(10), Duration::from_millis(200))
}

pub fn executor_with(
    endpoint: String,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
) -> Executor {
    Executor::new(
        UpstreamTarget {
            endpoint,
            api_key: API_KEY.to_string(),
            pool_max_idle: 2,
        },
        policy,
        breaker,
        ConcurrencyLimiter::new(2),
    )
    .expect("client builds")
}

pub fn breaker(failure_threshold: u32) -> Arc<CircuitBreaker> {
    Arc::new(CircuitBreaker::new(
        BreakerConfig::new()
            .with_failure_threshold(failure_threshold)
            .with_success_threshold(1)
            .with_timeout(Duration::from_secs(60)),
    ))
}

pub fn gateway(endpoint: String, rate_limit: usize) -> Gateway {
    Gateway::new(
        cache::shared(CacheStore::new(100, Duration::from_secs(300))),
        Arc::new(RateLimiter::new()),
        executor_with(endpoint, fast_policy(), breaker(5)),
        rate_limit,
        Duration::from_secs(60),
        GenerationDefaults {
            model: "test-model".to_string(),
            temperature: 0.5,
            max_tokens: 256,
        },
    )
}

pub fn payload(prompt: &str) -> ChatPayload {
    ChatPayload {
        messages: vec![
            ChatMessage::system("You write short replies."),
            ChatMessage::user(prompt),
        ],
        model: "test-model".to_string(),
        temperature: 0.5,
        max_tokens: 256,
    }
}

/// Accepts connections and never answers.
pub async fn silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Address with nothing listening.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
