//! Minimum-interval rate limiter shared by all outbound requests.
//!
//! The listing API, detail API, and lyrics pages all live behind the same
//! host, so a single limiter guards every request the pipeline makes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive `acquire` calls.
///
/// Cheap to clone; clones share the same schedule.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a limiter with a minimum interval between requests.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    /// Create a limiter from a millisecond interval. Zero disables pacing.
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Wait until the next request is allowed to start.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.inner.lock().await;
        let now = Instant::now();
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > now {
                tokio::time::sleep(ready_at - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_interval_does_not_block() {
        let limiter = RateLimiter::from_millis(0);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn spaces_consecutive_acquires() {
        let limiter = RateLimiter::from_millis(20);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn clones_share_schedule() {
        let limiter = RateLimiter::from_millis(20);
        let other = limiter.clone();
        let start = Instant::now();
        limiter.acquire().await;
        other.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
