// @file: extraction_engine/src/core/retry.rs
// @description: Bounded retry with a fixed backoff between attempts.
// @author: LAS.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for fixed-backoff retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Pause before each retry.
    pub backoff: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            max_retries: 1,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Run `operation` until it succeeds, fails with a non-retriable error, or
/// the retry budget is spent. Returns the last error together with the
/// number of attempts made.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if should_retry(&err) && attempts <= policy.max_retries => {
                sleep(policy.backoff).await;
            }
            Err(err) => return Err((err, attempts)),
        }
    }
}
