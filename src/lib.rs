//! Completion Shield - resilience layer in front of a chat-completion API
//!
//! Provides reply caching with TTL and LRU eviction, per-client sliding-window
//! rate limiting, a circuit breaker, bounded upstream concurrency and a
//! retrying request executor.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod resilience;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::{Gateway, Generated};
pub use tasks::{spawn_cleanup_task, spawn_compaction_task};
