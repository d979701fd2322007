//! Sliding-window rate limiter keyed by client identifier.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{Error, Result};

// == Rate Decision ==
/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests counted in the window after this check
    pub current_count: usize,
    pub limit: usize,
    /// Time until the oldest counted request leaves the window (rejections only)
    #[serde(skip)]
    pub retry_after: Option<Duration>,
}

/// Request instants for one identifier, oldest first.
#[derive(Debug)]
struct RateWindow {
    hits: VecDeque<Instant>,
    window: Duration,
}

impl RateWindow {
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) > self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

// == Rate Limiter ==
/// Admits at most `limit` requests per identifier in any trailing window.
///
/// All identifiers share one lock, so admission is first-come-first-served
/// in lock acquisition order. Rejected attempts are not recorded.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        // A panic mid-update leaves at worst one stale window behind
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Is Allowed ==
    /// Checks and, when admitted, records a request for `identifier`.
    pub fn is_allowed(&self, identifier: &str, limit: usize, window: Duration) -> RateDecision {
        self.is_allowed_at(identifier, limit, window, Instant::now())
    }

    // == Is Allowed At ==
    /// Same as [`is_allowed`](Self::is_allowed) with an explicit clock reading.
    pub fn is_allowed_at(
        &self,
        identifier: &str,
        limit: usize,
        window: Duration,
        now: Instant,
    ) -> RateDecision {
        let mut windows = self.lock();
        let entry = windows
            .entry(identifier.to_string())
            .or_insert_with(|| RateWindow {
                hits: VecDeque::new(),
                window,
            });
        entry.window = window;
        entry.prune(now);

        let count = entry.hits.len();
        if count < limit {
            entry.hits.push_back(now);
            return RateDecision {
                allowed: true,
                current_count: count + 1,
                limit,
                retry_after: None,
            };
        }

        let retry_after = entry
            .hits
            .front()
            .and_then(|&oldest| oldest.checked_add(window))
            .map(|leaves_at| leaves_at.saturating_duration_since(now))
            .unwrap_or(window);

        RateDecision {
            allowed: false,
            current_count: count,
            limit,
            retry_after: Some(retry_after),
        }
    }

    // == Check ==
    /// `Result` form of [`is_allowed`](Self::is_allowed).
    pub fn check(&self, identifier: &str, limit: usize, window: Duration) -> Result<RateDecision> {
        let decision = self.is_allowed(identifier, limit, window);
        if decision.allowed {
            Ok(decision)
        } else {
            warn!(
                client = %identifier,
                count = decision.current_count,
                limit,
                "Rate limit exceeded"
            );
            Err(Error::RateLimited {
                retry_after: decision.retry_after.unwrap_or(window),
            })
        }
    }

    // == Compact ==
    /// Prunes every window and drops identifiers left empty.
    ///
    /// Returns the number of identifiers dropped.
    pub fn compact(&self) -> usize {
        self.compact_at(Instant::now())
    }

    // == Compact At ==
    pub fn compact_at(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, entry| {
            entry.prune(now);
            !entry.hits.is_empty()
        });
        before - windows.len()
    }

    // == Tracked Identifiers ==
    /// Number of identifiers currently holding a window.
    pub fn tracked_identifiers(&self) -> usize {
        self.lock().len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_burst_over_limit_is_rejected() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for expected in 1..=3 {
            let decision = limiter.is_allowed_at("10.0.0.1", 3, WINDOW, now);
            assert!(decision.allowed);
            assert_eq!(decision.current_count, expected);
        }

        let decision = limiter.is_allowed_at("10.0.0.1", 3, WINDOW, now);
        assert!(!decision.allowed);
        assert_eq!(decision.current_count, 3);
        assert_eq!(decision.retry_after, Some(WINDOW));
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        limiter.is_allowed_at("c", 1, WINDOW, start);
        for _ in 0..10 {
            assert!(!limiter.is_allowed_at("c", 1, WINDOW, start).allowed);
        }

        // Only the admitted request ages out
        let later = start + WINDOW + Duration::from_millis(1);
        let decision = limiter.is_allowed_at("c", 1, WINDOW, later);
        assert!(decision.allowed);
        assert_eq!(decision.current_count, 1);
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        limiter.is_allowed_at("c", 2, WINDOW, start);
        limiter.is_allowed_at("c", 2, WINDOW, start + Duration::from_secs(30));

        let blocked = limiter.is_allowed_at("c", 2, WINDOW, start + Duration::from_secs(45));
        assert!(!blocked.allowed);
        assert_eq!(blocked.retry_after, Some(Duration::from_secs(15)));

        // The first request has left the window, the second has not
        let admitted = limiter.is_allowed_at("c", 2, WINDOW, start + Duration::from_secs(61));
        assert!(admitted.allowed);
        assert_eq!(admitted.current_count, 2);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.is_allowed_at("a", 1, WINDOW, now).allowed);
        assert!(!limiter.is_allowed_at("a", 1, WINDOW, now).allowed);
        assert!(limiter.is_allowed_at("b", 1, WINDOW, now).allowed);
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let limiter = RateLimiter::new();
        let decision = limiter.is_allowed("a", 0, WINDOW);
        assert!(!decision.allowed);
        assert_eq!(decision.current_count, 0);
    }

    #[test]
    fn test_unbounded_window_does_not_overflow() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.is_allowed_at("c", 1, Duration::MAX, now).allowed);
        let decision = limiter.is_allowed_at("c", 1, Duration::MAX, now);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after, Some(Duration::MAX));
    }

    #[test]
    fn test_compact_drops_empty_windows() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        limiter.is_allowed_at("old", 5, Duration::from_secs(10), start);
        limiter.is_allowed_at("fresh", 5, WINDOW, start + Duration::from_secs(20));
        assert_eq!(limiter.tracked_identifiers(), 2);

        let dropped = limiter.compact_at(start + Duration::from_secs(30));
        assert_eq!(dropped, 1);
        assert_eq!(limiter.tracked_identifiers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_allows_again_after_window() {
        let limiter = RateLimiter::new();

        for _ in 0..3 {
            assert!(limiter.check("ip", 3, WINDOW).is_ok());
        }
        match limiter.check("ip", 3, WINDOW) {
            Err(Error::RateLimited { retry_after }) => assert_eq!(retry_after, WINDOW),
            other => panic!("expected RateLimited, got {:?}", other),
        }

        tokio::time::advance(WINDOW + Duration::from_secs(1)).await;

        let decision = limiter.check("ip", 3, WINDOW).unwrap();
        assert_eq!(decision.current_count, 1);
    }
}
