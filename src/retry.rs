//! Retry with bounded exponential backoff
//!
//! Wraps any fallible async operation. Attempts are strictly sequential;
//! the delay between attempt k and k+1 is
//! `min(initial_delay * backoff_factor^(k-1), max_delay)`.

use crate::error::ChatError;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Attempt count and backoff timing for a resilient call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_factor: f64,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Build a validated policy. Every parameter must be strictly positive.
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        backoff_factor: f64,
        max_delay: Duration,
    ) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ChatError::Config(
                "retry policy needs at least one attempt".to_string(),
            ));
        }
        if initial_delay.is_zero() || max_delay.is_zero() {
            return Err(ChatError::Config(
                "retry delays must be positive".to_string(),
            ));
        }
        if !backoff_factor.is_finite() || backoff_factor <= 0.0 {
            return Err(ChatError::Config(format!(
                "invalid backoff factor: {}",
                backoff_factor
            )));
        }

        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_factor,
            max_delay,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);

        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, 1s initial delay, doubling, capped at 5s
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(5000),
        }
    }
}

/// Terminal failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed
    #[error("operation failed after {attempts} attempts: {last_error}")]
    Exhausted { last_error: E, attempts: u32 },

    /// The classifier marked a failure as permanent
    #[error("operation aborted after {attempts} attempt(s): {error}")]
    Aborted { error: E, attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Aborted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The underlying error of the final attempt
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
            RetryError::Aborted { error, .. } => error,
        }
    }
}

impl From<RetryError<ChatError>> for ChatError {
    fn from(err: RetryError<ChatError>) -> Self {
        match err {
            RetryError::Exhausted {
                last_error,
                attempts,
            } => ChatError::ExhaustedRetries {
                attempts,
                last_error: Box::new(last_error),
            },
            RetryError::Aborted { error, .. } => error,
        }
    }
}

/// Runs operations under a [`RetryPolicy`].
///
/// Agnostic to what the operation does: `execute` retries every error the
/// same way. `execute_if` takes a classifier for callers that want to stop
/// early on permanent failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor;

impl RetryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Retry every failure uniformly until the policy is exhausted
    pub async fn execute<T, E, F, Fut>(
        &self,
        policy: &RetryPolicy,
        operation: F,
    ) -> std::result::Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        self.execute_if(policy, operation, |_| true).await
    }

    /// Retry only failures `is_retryable` accepts
    pub async fn execute_if<T, E, F, Fut, P>(
        &self,
        policy: &RetryPolicy,
        mut operation: F,
        is_retryable: P,
    ) -> std::result::Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !is_retryable(&error) {
                        warn!(attempt, error = %error, "Permanent failure, not retrying");
                        return Err(RetryError::Aborted {
                            error,
                            attempts: attempt,
                        });
                    }

                    if attempt >= policy.max_attempts() {
                        warn!(attempt, error = %error, "Retry budget exhausted");
                        return Err(RetryError::Exhausted {
                            last_error: error,
                            attempts: attempt,
                        });
                    }

                    let delay = policy.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_default_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
        // capped
        assert_eq!(policy.delay_after(4), Duration::from_millis(5000));
        assert_eq!(policy.delay_after(60), Duration::from_millis(5000));
    }

    #[test]
    fn test_invalid_policies_rejected() {
        let second = Duration::from_secs(1);
        assert!(RetryPolicy::new(0, second, 2.0, second).is_err());
        assert!(RetryPolicy::new(3, Duration::ZERO, 2.0, second).is_err());
        assert!(RetryPolicy::new(3, second, 0.0, second).is_err());
        assert!(RetryPolicy::new(3, second, f64::NAN, second).is_err());
        assert!(RetryPolicy::new(3, second, 1.5, second).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_operation_backs_off_then_exhausts() {
        let policy = RetryPolicy::new(
            3,
            Duration::from_millis(1000),
            2.0,
            Duration::from_millis(5000),
        )
        .unwrap();
        let stamps: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

        let result = RetryExecutor::new()
            .execute(&policy, || {
                stamps.lock().unwrap().push(Instant::now());
                async { Err::<(), String>("service unavailable".to_string()) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts(), 3);
        assert!(matches!(err, RetryError::Exhausted { .. }));
        assert_eq!(err.into_inner(), "service unavailable");

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 3);
        assert_eq!(stamps[1] - stamps[0], Duration::from_millis(1000));
        assert_eq!(stamps[2] - stamps[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_returns_immediately() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryExecutor::new()
            .execute(&RetryPolicy::default(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 2 {
                        Err("flaky".to_string())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        tokio_test::assert_ok!(&result);
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_stops_on_permanent_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result: std::result::Result<(), _> = RetryExecutor::new()
            .execute_if(
                &RetryPolicy::default(),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err(ChatError::ServiceRejected {
                            status: 401,
                            message: "invalid key".to_string(),
                        })
                    }
                },
                ChatError::is_retryable,
            )
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Aborted { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(Instant::now() - start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_converts_to_chat_error() {
        let policy = RetryPolicy::new(
            2,
            Duration::from_millis(10),
            2.0,
            Duration::from_millis(100),
        )
        .unwrap();

        let result: std::result::Result<(), RetryError<ChatError>> = RetryExecutor::new()
            .execute(&policy, || async {
                Err(ChatError::TransientService("503".to_string()))
            })
            .await;

        let err: ChatError = result.unwrap_err().into();
        match err {
            ChatError::ExhaustedRetries {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last_error, ChatError::TransientService(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
