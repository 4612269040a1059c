//! Recovery strategies for errors raised at integration boundaries.
//!
//! Collaborators return typed errors; callers pick a strategy with
//! [`ErrorRecovery::determine_strategy`] and run the operation through
//! [`ErrorRecovery::apply_strategy`].

use crate::{CoreError, ErrorExt};
use std::time::Duration;
use tracing::info;

/// Recovery strategy for handling errors
#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    /// Retry the operation with exponential backoff
    RetryWithBackoff {
        max_attempts: usize,
        initial_delay: Duration,
        max_delay: Duration,
    },
    /// Skip the operation and continue
    Skip,
    /// Fail immediately
    Fail,
}

/// Result of an error recovery attempt
#[derive(Debug)]
pub enum RecoveryResult<T> {
    /// Operation succeeded, possibly after retries
    Recovered(T),
    /// Operation should be skipped
    Skipped,
    /// Error should be propagated
    Failed(CoreError),
}

impl<T> RecoveryResult<T> {
    pub fn is_recovered(&self) -> bool {
        matches!(self, RecoveryResult::Recovered(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RecoveryResult::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RecoveryResult::Failed(_))
    }

    /// Converts back into a `Result`. A skipped operation becomes
    /// `CoreError::Internal` so callers can still use `?`.
    pub fn into_result(self) -> Result<T, CoreError> {
        match self {
            RecoveryResult::Recovered(value) => Ok(value),
            RecoveryResult::Skipped => Err(CoreError::Internal {
                message: "operation skipped by recovery strategy".to_string(),
            }),
            RecoveryResult::Failed(error) => Err(error),
        }
    }
}

pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Determine the appropriate recovery strategy for a given error
    pub fn determine_strategy(error: &CoreError) -> RecoveryStrategy {
        match error {
            // Transient transport and provider errors
            CoreError::Network(_) | CoreError::GraphApi(_) | CoreError::Llm(_)
                if error.is_retryable() =>
            {
                RecoveryStrategy::RetryWithBackoff {
                    max_attempts: 3,
                    initial_delay: Duration::from_secs(1),
                    max_delay: Duration::from_secs(30),
                }
            }

            CoreError::Timeout { .. } => RecoveryStrategy::RetryWithBackoff {
                max_attempts: 2,
                initial_delay: Duration::from_secs(5),
                max_delay: Duration::from_secs(10),
            },

            CoreError::RateLimited { retry_after, .. } => {
                let delay = retry_after.unwrap_or_else(|| Duration::from_secs(60));
                RecoveryStrategy::RetryWithBackoff {
                    max_attempts: 2,
                    initial_delay: delay,
                    max_delay: Duration::from_secs(300),
                }
            }

            CoreError::RequestFailed { status_code, .. } => match status_code {
                Some(429) => RecoveryStrategy::RetryWithBackoff {
                    max_attempts: 2,
                    initial_delay: Duration::from_secs(60),
                    max_delay: Duration::from_secs(300),
                },
                Some(500..=599) => RecoveryStrategy::RetryWithBackoff {
                    max_attempts: 3,
                    initial_delay: Duration::from_secs(5),
                    max_delay: Duration::from_secs(60),
                },
                _ => RecoveryStrategy::Fail,
            },

            CoreError::InvalidInput { .. } | CoreError::NotFound { .. } => RecoveryStrategy::Skip,

            _ => RecoveryStrategy::Fail,
        }
    }

    /// Apply the recovery strategy to an operation
    pub async fn apply_strategy<F, T, Fut>(
        strategy: RecoveryStrategy,
        mut operation: F,
    ) -> RecoveryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        match strategy {
            RecoveryStrategy::RetryWithBackoff {
                max_attempts,
                initial_delay,
                max_delay,
            } => Self::retry_with_backoff(operation, max_attempts, initial_delay, max_delay).await,
            RecoveryStrategy::Skip => RecoveryResult::Skipped,
            RecoveryStrategy::Fail => match operation().await {
                Ok(value) => RecoveryResult::Recovered(value),
                Err(error) => RecoveryResult::Failed(error),
            },
        }
    }

    async fn retry_with_backoff<F, T, Fut>(
        mut operation: F,
        max_attempts: usize,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> RecoveryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        let mut delay = initial_delay;

        loop {
            match operation().await {
                Ok(result) => return RecoveryResult::Recovered(result),
                Err(error) => {
                    attempt += 1;

                    if attempt >= max_attempts || !error.is_retryable() {
                        return RecoveryResult::Failed(error);
                    }

                    if let Some(retry_delay) = error.retry_after() {
                        delay = retry_delay;
                    }
                    if delay > max_delay {
                        delay = max_delay;
                    }

                    info!(
                        "Recovery attempt {}/{} failed. Retrying after {:?}: {}",
                        attempt,
                        max_attempts,
                        delay,
                        error.user_friendly_message()
                    );

                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, max_delay);
                }
            }
        }
    }
}
