//! Periodic Cleanup Tasks
//!
//! Background tasks that sweep expired cache entries and compact rate-limit
//! windows. Each holds its lock for a single sweep only.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;
use crate::resilience::RateLimiter;

/// Spawns a background task that periodically removes expired cache entries.
///
/// The returned handle is aborted at shutdown.
///
/// # Example
/// ```ignore
/// let cache = cache::shared(CacheStore::new(1000, Duration::from_secs(300)));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(cache: SharedCache<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            "Starting cache cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.write().await.cleanup_expired();

            if removed > 0 {
                info!("Cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("Cache cleanup: no expired entries found");
            }
        }
    })
}

/// Spawns a background task that drops empty rate-limit windows.
pub fn spawn_compaction_task(limiter: Arc<RateLimiter>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            "Starting rate limiter compaction task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let dropped = limiter.compact();

            if dropped > 0 {
                info!("Rate limiter compaction: dropped {} idle clients", dropped);
            } else {
                debug!("Rate limiter compaction: nothing to drop");
            }
        }
    })
}
