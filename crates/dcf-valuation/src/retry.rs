//! Retry logic for rate-limited operations
//!
//! Only [`ErrorKind::RateLimited`] failures are retried, after a fixed wait.
//! Every other failure aborts the operation at once.

use crate::config::ValuationConfig;
use crate::error::{ErrorKind, Result, ValuationError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,

    /// Fixed wait between a rate-limited attempt and the next
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait: Duration::from_secs(30),
        }
    }
}

/// Progress reported to the caller while an operation runs
#[derive(Debug)]
pub enum RetryEvent<'a> {
    /// Attempt `attempt` (1-based) is about to start
    Attempt { attempt: u32, max_attempts: u32 },
    /// Attempt `attempt` was rate limited; waiting before the next one
    Waiting {
        attempt: u32,
        max_attempts: u32,
        wait: Duration,
        error: &'a ValuationError,
    },
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self { max_attempts, wait }
    }

    pub fn from_config(config: &ValuationConfig) -> Self {
        Self::new(config.max_attempts, config.retry_wait)
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn is_retryable(error: &ValuationError) -> bool {
        error.kind() == ErrorKind::RateLimited
    }

    /// Execute an async operation, retrying while it is rate limited.
    ///
    /// `on_event` sees each attempt start and each scheduled wait. No wait is
    /// scheduled after the final attempt; the last error is returned instead.
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation_name: &str,
        mut on_event: E,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        E: FnMut(&RetryEvent<'_>),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("Attempt {attempt}/{max_attempts} for operation: {operation_name}");
            on_event(&RetryEvent::Attempt {
                attempt,
                max_attempts,
            });

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            "Operation '{operation_name}' succeeded after {} retries",
                            attempt - 1
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !Self::is_retryable(&error) {
                debug!("Operation '{operation_name}' failed with non-retryable error");
                return Err(error);
            }

            if attempt >= max_attempts {
                warn!(
                    "Operation '{operation_name}' still rate limited after {max_attempts} attempts: {error}"
                );
                return Err(error);
            }

            warn!(
                "Operation '{operation_name}' rate limited (attempt {attempt}/{max_attempts}). Retrying in {:?}",
                self.wait
            );
            on_event(&RetryEvent::Waiting {
                attempt,
                max_attempts,
                wait: self.wait,
                error: &error,
            });
            sleep(self.wait).await;
            attempt += 1;
        }
    }
}
