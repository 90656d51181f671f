//! Minimum spacing between quote API requests.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Enforces a minimum interval between consecutive operations.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_operation: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_operation: Mutex::new(None),
        }
    }

    /// Sleeps until the next operation is allowed, then records it.
    ///
    /// Returns how long the caller was held back.
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut last = self.last_operation.lock().await;

        let wait = last.map_or(Duration::ZERO, |at| {
            self.min_interval.saturating_sub(at.elapsed())
        });

        if !wait.is_zero() {
            debug!("Quote API cooldown: waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }

        *last = Some(Instant::now());
        wait
    }
}
