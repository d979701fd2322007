//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod entry;
mod key;
mod stats;
mod store;


use std::sync::Arc;
use tokio::sync::RwLock;

// Re-export public types
pub use entry::CacheEntry;
pub use key::{CacheKey, CacheKeyBuilder};
pub use stats::CacheStats;
pub use store::{CacheStore, EntrySnapshot};

/// Process-wide cache handle; every operation goes through the lock.
pub type SharedCache<V> = Arc<RwLock<CacheStore<V>>>;

/// Wraps a store into a shareable handle.
pub fn shared<V>(store: CacheStore<V>) -> SharedCache<V> {
    Arc::new(RwLock::new(store))
}
