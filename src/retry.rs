//! Retry policies and predicates for the two exchange layers.
//!
//! Both layers use the same shape of loop: at most `max_attempts` attempts, a
//! constant delay before every attempt after the first, and a predicate that
//! decides whether a failed attempt is worth repeating. The raw layer retries
//! transport failures ([`RetryOnTransport`]); the JSON layer retries status codes
//! outside the acceptable set ([`RetryOnUnacceptableStatus`]).

use crate::{Error, ErrorKind, Result};
use std::future::Future;
use std::time::Duration;

/// How many attempts to make and how long to wait between them.
///
/// # Examples
///
/// ```
/// use httpwrap::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(500));
///
/// assert_eq!(policy.delay_for_attempt(1), Some(Duration::ZERO));
/// assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(500)));
/// assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_millis(500)));
/// assert_eq!(policy.delay_for_attempt(4), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// The maximum number of attempts. `0` means no attempt is ever made.
    pub max_attempts: usize,
    /// The constant delay before every attempt after the first.
    pub delay: Duration,
}

/// The value produced by the successful attempt of a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed<T> {
    /// The value returned by the successful attempt.
    pub value: T,
    /// The 1-indexed number of the successful attempt.
    pub attempts: usize,
}

impl RetryPolicy {
    /// Creates a policy making at most `max_attempts` attempts, `delay` apart.
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Returns the delay to wait before the given attempt, or `None` if the
    /// attempt is beyond the ceiling.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number (1-indexed, so 1 = first attempt)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match attempt {
            0 => None,
            a if a > self.max_attempts => None,
            1 => Some(Duration::ZERO),
            _ => Some(self.delay),
        }
    }

    /// Runs `operation` until it succeeds, fails with an error the predicate
    /// refuses to retry, or the ceiling is reached.
    ///
    /// Returns `Ok(None)` without calling `operation` when `max_attempts` is 0.
    /// When the ceiling is reached the error of the last attempt is returned.
    /// Errors carry the number of attempts made (see [`Error::attempts`]).
    pub async fn run<T, F, Fut>(
        &self,
        predicate: &dyn RetryPredicate,
        mut operation: F,
    ) -> Result<Option<Completed<T>>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tracing::info!(
                    delay_ms = self.delay.as_millis(),
                    attempt = attempt,
                    max_attempts = self.max_attempts,
                    "Retrying after delay"
                );
                tokio::time::sleep(self.delay).await;
            }

            match operation(attempt).await {
                Ok(value) => {
                    return Ok(Some(Completed {
                        value,
                        attempts: attempt,
                    }))
                }
                Err(e) => {
                    tracing::warn!(
                        error = &e as &dyn std::error::Error,
                        stage = e.stage(),
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        "Attempt failed"
                    );

                    if !predicate.should_retry(&e, attempt) {
                        return Err(e.with_attempts(attempt));
                    }
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e.with_attempts(self.max_attempts)),
            None => Ok(None),
        }
    }
}

/// Decides whether a failed attempt should be repeated.
///
/// Closures of the shape `Fn(&Error, usize) -> bool` implement this trait.
///
/// # Examples
///
/// ```
/// use httpwrap::{Error, ErrorKind, RetryPredicate};
///
/// struct RetryOnAnything;
///
/// impl RetryPredicate for RetryOnAnything {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         error.kind() != ErrorKind::Configuration
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Determines whether the attempt that failed with `error` should be retried.
    ///
    /// # Arguments
    ///
    /// * `error` - The error of the failed attempt
    /// * `attempt` - The attempt number (1-indexed)
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

impl<F> RetryPredicate for F
where
    F: Fn(&Error, usize) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self(error, attempt)
    }
}

/// Retry connection failures and failed body reads. Used by the raw exchange layer.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTransport;

impl RetryPredicate for RetryOnTransport {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.kind() == ErrorKind::Transport
    }
}

/// Retry status codes outside the acceptable set. Used by the JSON exchange layer.
///
/// Transport errors are deliberately not retried here: they reach this layer
/// only after the raw layer has exhausted its own attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnUnacceptableStatus;

impl RetryPredicate for RetryOnUnacceptableStatus {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.kind() == ErrorKind::Policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Cause;
    use http::StatusCode;

    fn always(_: &Error, _: usize) -> bool {
        true
    }

    fn never(_: &Error, _: usize) -> bool {
        false
    }

    #[test]
    fn test_delay_for_attempt() {
        let policy = RetryPolicy::new(2, Duration::from_secs(1));

        assert_eq!(policy.delay_for_attempt(0), None);
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::ZERO));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for_attempt(3), None);
        assert_eq!(RetryPolicy::default().delay_for_attempt(1), None);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_calls_operation() {
        let mut calls = 0;
        let result = RetryPolicy::new(0, Duration::from_secs(10))
            .run(&always, |_| {
                calls += 1;
                async { Ok::<_, Error>(()) }
            })
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_sleeps_between_attempts_only() {
        let mut calls = 0;
        let start = tokio::time::Instant::now();

        let err = RetryPolicy::new(3, Duration::from_millis(100))
            .run(&always, |attempt| {
                calls += 1;
                async move { Err::<(), _>(Error::invalid_request(format!("attempt {attempt}"))) }
            })
            .await
            .unwrap_err();

        let elapsed = start.elapsed();
        assert_eq!(calls, 3);
        assert_eq!(err.attempts(), 3);
        assert!(err.to_string().contains("attempt 3"));
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let mut calls = 0;
        let err = RetryPolicy::new(5, Duration::ZERO)
            .run(&never, |_| {
                calls += 1;
                async { Err::<(), _>(Error::invalid_request("bad")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls, 1);
        assert_eq!(err.attempts(), 1);
    }

    #[tokio::test]
    async fn test_success_after_failures_reports_attempts() {
        let completed = RetryPolicy::new(4, Duration::ZERO)
            .run(&always, |attempt| async move {
                if attempt < 3 {
                    Err(Error::invalid_request("not yet"))
                } else {
                    Ok(attempt * 10)
                }
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(completed.value, 30);
        assert_eq!(completed.attempts, 3);
    }

    #[test]
    fn test_predicates_split_by_kind() {
        let policy_error = Error::new(Cause::UnacceptableStatus {
            status: StatusCode::BAD_GATEWAY,
            raw_response: String::new(),
        });
        let construction_error = Error::invalid_request("bad url");

        assert!(RetryOnUnacceptableStatus.should_retry(&policy_error, 1));
        assert!(!RetryOnTransport.should_retry(&policy_error, 1));
        assert!(!RetryOnUnacceptableStatus.should_retry(&construction_error, 1));
        assert!(!RetryOnTransport.should_retry(&construction_error, 1));
    }
}
