//! Bounded retry with backoff for remote calls.
//!
//! A single retry strategy shared by the paginated fetcher and the mutator:
//! the policy (attempt budget, backoff schedule) comes from [`RetryConfig`],
//! the transient/permanent split from [`RemoteError::is_transient`].

use std::future::Future;

use tracing::{debug, warn};

use super::RemoteError;
use crate::config::RetryConfig;

/// A call that failed after its full retry budget, or immediately on a
/// permanent error.
#[derive(Debug)]
pub struct RetryError {
    pub error: RemoteError,
    /// Total calls made, including the failing one.
    pub attempts: u32,
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {} attempts)", self.error, self.attempts)
    }
}

impl std::error::Error for RetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Execute a remote call with bounded retry.
///
/// `make_call` is invoked once per attempt. Transient errors are retried up
/// to `max_retries` times with backoff between attempts; permanent errors
/// fail immediately. On success returns the value together with the number
/// of calls made.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    make_call: F,
) -> Result<(T, u32), RetryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let max_attempts = if config.enabled {
        config.max_retries + 1 // +1 for the initial call
    } else {
        1
    };

    for attempt in 0..max_attempts {
        match make_call().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        operation = operation,
                        attempt = attempt + 1,
                        "call succeeded after retry"
                    );
                }
                return Ok((value, attempt + 1));
            }
            Err(error) => {
                if error.is_transient() && attempt < max_attempts - 1 {
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        operation = operation,
                        error = %error,
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis(),
                        "transient error, will retry after delay"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                if attempt > 0 {
                    warn!(
                        operation = operation,
                        error = %error,
                        attempts = attempt + 1,
                        "call failed after all retry attempts"
                    );
                }

                return Err(RetryError {
                    error,
                    attempts: attempt + 1,
                });
            }
        }
    }

    unreachable!("retry loop should have returned")
}
