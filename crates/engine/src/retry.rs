//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

use short_straddle_core::{Result, RetryConfig, StrategyError};

use crate::clock::{Clock, StopToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_secs(config.delay_secs),
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` attempts have been made.
///
/// `on_retry` sees the attempt number (1-based) and the error of every
/// attempt that will be followed by another one. The final error is
/// returned unchanged. The delay is slept on `clock` and cut short by
/// `stop`.
///
/// # Errors
///
/// Returns the last error from `op`, or `StrategyError::Cancelled` if
/// stopped while waiting between attempts.
pub async fn retry<T, F, Fut, O>(
    policy: RetryPolicy,
    clock: &dyn Clock,
    stop: &StopToken,
    mut on_retry: O,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    O: FnMut(u32, &StrategyError),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                on_retry(attempt, &e);
                if stop.is_cancelled() {
                    return Err(StrategyError::Cancelled);
                }
                tokio::select! {
                    () = clock.sleep(policy.delay) => {}
                    () = stop.cancelled() => return Err(StrategyError::Cancelled),
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
