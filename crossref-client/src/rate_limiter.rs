use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub min_interval: Duration,
}

impl RateLimitConfig {
    pub fn crossref_polite() -> Self {
        Self {
            // 10 requests per second
            min_interval: Duration::from_millis(100),
        }
    }
}

/// Keeps consecutive requests at least `min_interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    last_request: Mutex<Option<Instant>>,
    total_wait: Mutex<Duration>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(None),
            total_wait: Mutex::new(Duration::ZERO),
        }
    }

    /// Sleeps until the next request may go out, returning how long it slept.
    pub async fn wait(&self) -> Duration {
        let mut last = self.last_request.lock().await;

        let wait_time = last
            .map(|t| self.config.min_interval.saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        if !wait_time.is_zero() {
            sleep(wait_time).await;
            *self.total_wait.lock().await += wait_time;
        }

        *last = Some(Instant::now());
        wait_time
    }

    /// Time spent sleeping across all requests so far.
    pub async fn total_wait(&self) -> Duration {
        *self.total_wait.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_not_delayed() {
        let limiter = RateLimiter::new(RateLimitConfig::crossref_polite());

        assert_eq!(limiter.wait().await, Duration::ZERO);
        assert_eq!(limiter.total_wait().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_consecutive_requests_are_spaced() {
        let limiter = RateLimiter::new(RateLimitConfig {
            min_interval: Duration::from_millis(40),
        });

        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert!(limiter.total_wait().await > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::new(RateLimitConfig {
            min_interval: Duration::ZERO,
        });
        for _ in 0..3 {
            assert_eq!(limiter.wait().await, Duration::ZERO);
        }
    }
}
