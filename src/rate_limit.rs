use std::time::Duration;
use tracing::debug;

use crate::config::SyncSettings;
use crate::shutdown::Shutdown;

/// Fixed pacing between submissions and between batches.
///
/// Traffic is self-generated and bounded, so there is no adaptive backoff.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    item_delay: Duration,
    batch_delay: Duration,
    shutdown: Shutdown,
}

impl RateLimiter {
    pub fn new(item_delay: Duration, batch_delay: Duration, shutdown: Shutdown) -> Self {
        Self {
            item_delay,
            batch_delay,
            shutdown,
        }
    }

    pub fn from_settings(settings: &SyncSettings, shutdown: Shutdown) -> Self {
        Self::new(settings.item_delay(), settings.batch_delay(), shutdown)
    }

    /// Pause after a submission, whatever its outcome. Returns `false` if interrupted.
    pub async fn between_items(&self) -> bool {
        debug!(delay = ?self.item_delay, "waiting before next item");
        self.shutdown.sleep(self.item_delay).await
    }

    /// Pause after a batch; callers skip this after the final batch.
    pub async fn between_batches(&self) -> bool {
        debug!(delay = ?self.batch_delay, "waiting before next batch");
        self.shutdown.sleep(self.batch_delay).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn delays_follow_settings() {
        let settings = SyncSettings {
            item_delay_ms: 2_000,
            batch_delay_ms: None,
            ..SyncSettings::default()
        };
        let limiter = RateLimiter::from_settings(&settings, Shutdown::new());

        let start = Instant::now();
        assert!(limiter.between_items().await);
        assert!(start.elapsed() >= Duration::from_secs(2));

        let start = Instant::now();
        assert!(limiter.between_batches().await);
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn interrupted_limiter_returns_false() {
        let shutdown = Shutdown::new();
        let limiter = RateLimiter::new(Duration::from_secs(30), Duration::from_secs(60), shutdown.clone());
        shutdown.request();
        assert!(!limiter.between_items().await);
        assert!(!limiter.between_batches().await);
    }
}
