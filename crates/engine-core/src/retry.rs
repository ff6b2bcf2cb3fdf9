use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Indicates whether a failed attempt may be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Policy for re-attempting a failed batch.
///
/// The default allows a single attempt: a failed batch is counted and the
/// transfer moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: if max_delay.is_zero() {
                base_delay
            } else {
                max_delay
            },
        }
    }

    /// One attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// `retries` extra attempts after the first, with database-friendly backoff.
    pub fn with_retries(retries: usize) -> Self {
        Self::new(
            retries + 1,
            Duration::from_millis(250),
            Duration::from_secs(5),
        )
    }

    /// Called after failed attempt number `attempt` (1-based). Sleeps for the
    /// backoff and returns `true` when another attempt is allowed, otherwise
    /// returns `false` at once.
    pub async fn wait_before_retry(&self, attempt: usize) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }

        let delay = self.backoff_delay(attempt.saturating_sub(1));
        warn!(
            attempt,
            max_attempts = self.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Attempt failed, retrying"
        );
        sleep(delay).await;
        true
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let factor = 1u128 << attempt.min(6);
        let delay_ms = self.base_delay.as_millis().saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}
