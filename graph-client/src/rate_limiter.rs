use daypost_core::GraphConfig;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Minimum gap between two successful posts.
    pub min_interval: Duration,
}

impl RateLimitConfig {
    pub fn graph_api() -> Self {
        Self {
            min_interval: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            min_interval: Duration::from_secs(config.min_post_interval_secs),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::graph_api()
    }
}

/// Spaces outbound posts by a fixed minimum interval.
///
/// Only posts that actually went out are recorded; a failed attempt does not
/// delay the next one.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    last_post: Mutex<Option<Instant>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub min_interval: Duration,
    pub has_posted: bool,
    pub ready_in: Duration,
}

impl RateLimitStatus {
    pub fn is_ready(&self) -> bool {
        self.ready_in.is_zero()
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_post: Mutex::new(None),
        }
    }

    /// Sleeps until the minimum interval since the last post has elapsed.
    /// Returns how long it waited.
    pub async fn wait_turn(&self) -> Duration {
        let wait = self.time_until_ready().await;
        if !wait.is_zero() {
            info!("Rate limiting: waiting {:.1} seconds", wait.as_secs_f64());
            sleep(wait).await;
        }
        wait
    }

    pub async fn record_post(&self) {
        *self.last_post.lock().await = Some(Instant::now());
    }

    pub async fn time_until_ready(&self) -> Duration {
        match *self.last_post.lock().await {
            Some(last) => self.config.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        let has_posted = self.last_post.lock().await.is_some();
        RateLimitStatus {
            min_interval: self.config.min_interval,
            has_posted,
            ready_in: self.time_until_ready().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(millis: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            min_interval: Duration::from_millis(millis),
        })
    }

    #[tokio::test]
    async fn test_first_post_does_not_wait() {
        let limiter = RateLimiter::new(RateLimitConfig::graph_api());
        assert_eq!(limiter.wait_turn().await, Duration::ZERO);

        let status = limiter.get_rate_limit_status().await;
        assert!(!status.has_posted);
        assert!(status.is_ready());
        assert_eq!(status.min_interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_waits_out_remaining_interval() {
        let limiter = limiter(80);
        limiter.record_post().await;

        let remaining = limiter.time_until_ready().await;
        assert!(remaining > Duration::ZERO);
        assert!(remaining <= Duration::from_millis(80));

        let start = Instant::now();
        let waited = limiter.wait_turn().await;
        assert!(waited > Duration::ZERO);
        assert!(start.elapsed() >= waited);
        assert!(limiter.get_rate_limit_status().await.is_ready());
    }

    #[tokio::test]
    async fn test_interval_already_elapsed() {
        let limiter = limiter(10);
        limiter.record_post().await;
        sleep(Duration::from_millis(20)).await;
        assert_eq!(limiter.wait_turn().await, Duration::ZERO);
    }

    #[test]
    fn test_config_from_graph_settings() {
        let mut graph = GraphConfig::default();
        graph.min_post_interval_secs = 5;
        assert_eq!(
            RateLimitConfig::from_config(&graph).min_interval,
            Duration::from_secs(5)
        );
    }
}
