//! Bounded exponential backoff for opening provider streams, driven by
//! `tokio-retry2`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tributary_error::RetryableError;
use tracing::warn;

/// Retry schedule for transient provider failures.
///
/// Attempt `n` (1-based) that fails with a retryable error is followed by a
/// delay of `base_delay × 2^(n-1)`. Terminal errors are returned at once.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tributary_models::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt after `attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out.
    ///
    /// The operation receives the 1-based attempt number. On exhaustion the
    /// last error is returned.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
    {
        let max_attempts = self.max_attempts;
        let schedule: Vec<Duration> = (1..max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .collect();
        let mut attempt = 0;

        Retry::spawn(schedule, || {
            attempt += 1;
            let current = attempt;
            let delay = self.delay_for_attempt(current);
            let call = operation(current);
            async move {
                match call.await {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_retryable() => {
                        if current < max_attempts {
                            warn!(
                                attempt = current,
                                max_attempts,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "Transient error, will retry"
                            );
                        } else {
                            warn!(attempts = current, error = %e, "Retries exhausted");
                        }
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => {
                        warn!(attempt = current, error = %e, "Permanent error, failing immediately");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let delays: Vec<_> = (1..=4).map(|n| policy.delay_for_attempt(n)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40),
                Duration::from_millis(80),
            ]
        );
    }

    #[derive(Debug)]
    struct Flaky(bool);

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky(retryable={})", self.0)
        }
    }

    impl RetryableError for Flaky {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn run_makes_exactly_max_attempts() {
        let policy = RetryPolicy::new(4, Duration::from_millis(1));
        let mut seen = Vec::new();

        let result: Result<(), Flaky> = policy
            .run(|attempt| {
                seen.push(attempt);
                async { Err(Flaky(true)) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn run_stops_on_permanent_error() {
        let policy = RetryPolicy::new(4, Duration::from_millis(1));
        let mut calls = 0;

        let result: Result<(), Flaky> = policy
            .run(|_| {
                calls += 1;
                async { Err(Flaky(false)) }
            })
            .await;

        assert!(!result.unwrap_err().0);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn run_returns_first_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result = policy
            .run(|attempt| async move {
                if attempt < 2 { Err(Flaky(true)) } else { Ok(attempt) }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
