//! Bounded-permit gate for outbound upstream calls.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

// == Concurrency Limiter ==
/// Counting semaphore capping simultaneous upstream calls.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

// == Concurrency Permit ==
/// Held for the duration of one upstream call; dropping it releases the slot.
#[derive(Debug)]
pub struct ConcurrencyPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyPermit {
    // == Release ==
    /// Returns the permit explicitly. Dropping has the same effect.
    pub fn release(self) {}
}

impl ConcurrencyLimiter {
    // == Constructor ==
    /// At least one permit is always available.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    // == Acquire ==
    /// Waits until a permit is free. Fails only once the limiter is closed.
    pub async fn acquire(&self) -> Result<ConcurrencyPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Shutdown)?;
        Ok(ConcurrencyPermit { _permit: permit })
    }

    // == Accessors ==
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.semaphore.available_permits())
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    // == Close ==
    /// Rejects new acquires; permits already handed out stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_third_acquire_blocks_until_release() {
        let limiter = ConcurrencyLimiter::new(2);

        let first = limiter.acquire().await.unwrap();
        let _second = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 2);

        let mut third = task::spawn(limiter.acquire());
        assert_pending!(third.poll());

        first.release();
        assert!(third.is_woken());
        let permit = assert_ready!(third.poll()).unwrap();
        assert_eq!(limiter.available_permits(), 0);

        drop(permit);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_permit() {
        let limiter = ConcurrencyLimiter::new(1);
        {
            let _permit = limiter.acquire().await.unwrap();
            assert_eq!(limiter.available_permits(), 0);
        }
        assert_eq!(limiter.available_permits(), 1);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.max_concurrent(), 1);

        let mut acquire = task::spawn(limiter.acquire());
        let permit = assert_ready!(acquire.poll()).unwrap();
        assert_eq!(limiter.in_flight(), 1);
        drop(permit);
    }

    #[tokio::test]
    async fn test_close_fails_new_acquires() {
        let limiter = ConcurrencyLimiter::new(1);
        let held = limiter.acquire().await.unwrap();

        limiter.close();
        assert!(matches!(limiter.acquire().await, Err(Error::Shutdown)));

        // In-flight permit is unaffected
        drop(held);
    }
}
