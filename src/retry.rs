/// Linear-backoff retry for indexer calls.
///
/// Only transient failures are retried; a fatal read error surfaces on the
/// first attempt. The delay grows linearly with the attempt number, so the
/// default policy waits 1s, 2s, ... 9s between its ten attempts.
use std::future::Future;
use std::time::Duration;

use crate::errors::ReadError;
use crate::logger::{self, LogTag};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub unit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            unit_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Runs `operation` until it succeeds, fails fatally, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T, ReadError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ReadError>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    logger::warning(
                        LogTag::Retry,
                        &format!(
                            "Attempt {}/{} failed: {}",
                            attempt, self.max_attempts, error
                        ),
                    );
                    tokio::time::sleep(self.unit_delay * attempt).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
