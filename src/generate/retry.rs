//! Bounded retry for hosted-API calls that fail transiently.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::GenerateError;

/// Exponential backoff with equal jitter: each delay is drawn from
/// `[base/2, base)` where `base` doubles per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub attempts: u32,
    pub initial: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.initial.as_millis() as u64 * 2u64.saturating_pow(retry);
        let half = base / 2;
        Duration::from_millis(half + fastrand::u64(..half.max(1)))
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempts run out.
    /// Only [`GenerateError::is_transient`] errors are retried.
    pub async fn retry<F, Fut, T>(&self, mut op: F) -> Result<T, GenerateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerateError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.delay(attempt - 1);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
