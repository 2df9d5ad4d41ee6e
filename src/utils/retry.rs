//! Retry utilities with exponential backoff for resilient API calls.
//!
//! Only timeout-class transport failures are retried by default. HTTP status
//! failures, decode failures and refused connections surface on first occurrence.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::sources::{SourceError, TransportKind};

/// Errors that can tell the retry loop what kind of transport failure they are
pub trait Retryable {
    /// The transport class of this failure, `None` for anything that is not transport
    fn transport_kind(&self) -> Option<TransportKind>;
}

impl Retryable for SourceError {
    fn transport_kind(&self) -> Option<TransportKind> {
        SourceError::transport_kind(self)
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after that
    pub base_delay: Duration,
    /// Transport failures worth another attempt
    pub retry_on: Vec<TransportKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Policy retrying connect, read and generic timeouts
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            retry_on: vec![
                TransportKind::ConnectTimeout,
                TransportKind::ReadTimeout,
                TransportKind::Timeout,
            ],
        }
    }

    /// Replace the set of retryable transport failures
    pub fn retry_on(mut self, kinds: impl IntoIterator<Item = TransportKind>) -> Self {
        self.retry_on = kinds.into_iter().collect();
        self
    }

    pub fn should_retry<E: Retryable>(&self, err: &E) -> bool {
        err.transport_kind()
            .is_some_and(|kind| self.retry_on.contains(&kind))
    }

    /// Delay slept before the given 1-based attempt. The first attempt has none.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }
}

/// Policy used for the People directory: 4 attempts, 2 s initial delay
pub fn people_retry_policy() -> RetryPolicy {
    RetryPolicy::new(4, Duration::from_secs(2))
}

/// Execute an async operation, retrying retryable failures with exponential backoff
///
/// # Arguments
///
/// * `policy` - Retry configuration
/// * `label` - Name of the operation, used in log output
/// * `operation` - The async operation to execute
///
/// # Returns
///
/// The first success, the first non-retryable error, or the error from the final attempt
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    operation: F,
) -> Result<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_sleep(policy, label, operation, sleep).await
}

async fn retry_with_sleep<T, E, F, Fut, S, SFut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
    mut pause: S,
) -> Result<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(result);
            }
            Err(error) => {
                if !policy.should_retry(&error) || attempt >= max_attempts {
                    return Err(error);
                }

                attempt += 1;
                let delay = policy.delay_before(attempt).unwrap_or_default();
                tracing::warn!(
                    "Retrying {} in {:.2} seconds... (attempt {}/{})",
                    label,
                    delay.as_secs_f64(),
                    attempt - 1,
                    max_attempts
                );
                pause(delay).await;
            }
        }
    }
}
