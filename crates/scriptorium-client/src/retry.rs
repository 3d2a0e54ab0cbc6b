//! Exponential backoff for the submission network call.
//!
//! Only errors classified retryable by [`UploadError::is_retryable`] are
//! retried; everything else propagates immediately. Delays grow by the
//! configured multiplier and are capped, so high attempt counts do not
//! produce excessively long waits.

use std::future::Future;
use std::time::Duration;

use scriptorium_core::config::RetryConfig;
use scriptorium_core::UploadError;

#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay before retry number `attempt` (0-based): initial delay scaled
    /// by `multiplier^attempt`, capped at `max_delay`. Non-decreasing.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled =
            self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.config.max_delay.as_secs_f64()))
    }

    /// Run `op` with backoff: at most `1 + max_retries` attempts.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, UploadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
