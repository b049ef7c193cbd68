//! Backoff for the access check
//!
//! Only `GET /api/tool-access` is retried; usage recording never is, since a
//! lost response could otherwise consume two uses.
//!
//! Retries share the access-check timeout. A retry whose backoff would end
//! past that budget is not attempted and the last error is returned, so a
//! flaky server fails closed on time rather than being cut off mid-sleep.

use std::collections::hash_map::RandomState;
use std::future::Future;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{GateError, Result};
use crate::metrics;

/// Backoff settings for the access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never retry.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Retries after the first attempt.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Delay before the first retry; doubles per retry up to one second.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self.max_delay = self.max_delay.max(delay);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff before retry number `retry` (0-based), with up to 25% jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay);

        let spread = delay.as_millis() as u64 / 4;
        if spread == 0 {
            return delay;
        }
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u32(retry);
        delay + Duration::from_millis(hasher.finish() % spread)
    }
}

/// Run `check` until it succeeds, fails permanently, runs out of retries or
/// the next backoff would overrun `budget`.
pub(crate) async fn retry_access<F, Fut, T>(
    config: &RetryConfig,
    budget: Duration,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = Instant::now() + budget;
    let mut retry = 0;

    loop {
        let err = match check().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retryable() || retry >= config.max_retries {
            return Err(err);
        }

        let delay = config.backoff(retry);
        if Instant::now() + delay >= deadline {
            debug!(retry, error = %err, "no time left for another access check");
            return Err(err);
        }

        warn!(
            retry = retry + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "access check failed, retrying"
        );
        metrics::record_retry(retry + 1);
        sleep(delay).await;
        retry += 1;
    }
}
