//! Retry logic.
//!
//! # Responsibilities
//! - Execute an async operation with a bounded number of attempts
//! - Sleep with exponential backoff + jitter between attempts
//! - Stop immediately on non-retryable errors or cancellation
//!
//! # Design Decisions
//! - The caller decides what is retryable (404 is not, 5xx is)
//! - The backoff sleep is a cancellation point

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Failed { error: E, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::Failed { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, runs out of
/// attempts, or `cancel` fires. `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
    is_retryable: R,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = tokio::select! {
            result = op(attempt) => result,
            _ = cancel.cancelled() => return RetryOutcome::Cancelled { attempts: attempt },
        };

        match result {
            Ok(value) => return RetryOutcome::Succeeded { value, attempts: attempt },
            Err(error) if attempt >= max_attempts || !is_retryable(&error) => {
                return RetryOutcome::Failed { error, attempts: attempt };
            }
            Err(_) => {
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return RetryOutcome::Cancelled { attempts: attempt },
                }
            }
        }
    }
}
