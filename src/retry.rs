//! Bounded retry with a fixed delay
//!
//! Shared by the connection manager and the notification dispatcher so both call
//! sites have the same attempt accounting.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Attempt count and pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

/// Every attempt failed; carries the error from the last one
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// The closure receives the 1-based attempt number. The delay is only applied
    /// between attempts, never after the last one.
    pub async fn run<F, Fut, T, E>(
        &self,
        what: &str,
        mut operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        operation = %what,
                        attempt,
                        max_attempts = self.max_attempts,
                        retry_in_secs = self.delay.as_secs_f64(),
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        operation = %what,
                        attempts = attempt,
                        error = %e,
                        "All attempts failed"
                    );
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn should_default_to_three_attempts_five_seconds_apart() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_secs(5));
    }

    #[test]
    fn should_clamp_zero_attempts_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);

        assert_eq!(policy.max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_succeed_on_first_try_without_delay() {
        // Arrange
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let started = Instant::now();

        // Act
        let result = policy
            .run("test", |_| async { Ok::<_, String>("success") })
            .await;

        // Assert
        assert_eq!(result.ok(), Some("success"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_until_success_with_fixed_delay() {
        // Arrange
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let attempts = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        // Act
        let result = policy
            .run("test", |attempt| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err(format!("attempt {attempt} refused"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        // Assert
        assert_eq!(result.ok(), Some(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_exhaustion_with_last_error() {
        // Arrange
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let attempts = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        // Act
        let result = policy
            .run("test", |attempt| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(format!("failure #{attempt}"))
                }
            })
            .await;

        // Assert
        let exhausted = result.expect_err("all attempts should fail");
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "failure #3");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Two pauses between three attempts, none after the last one.
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }
}
