//! Fixed-delay retry of fallible async operations.

use std::{
    fmt::Display,
    future::Future,
    time::Duration,
};
use tracing::debug;

/// Default number of invocations before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between invocations.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Retry an operation up to `max_attempts` times with a fixed `delay` between
/// attempts. There is no backoff growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Number of invocations `execute` performs before giving up.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Invoke `operation` until it succeeds or the attempt budget is spent.
    ///
    /// Returns the first success, or the error of the final invocation. The
    /// delay only suspends the calling task.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= attempts => return Err(err),
                Err(err) => {
                    debug!(
                        attempt,
                        max_attempts = attempts,
                        delay = ?self.delay,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{
        AtomicU32,
        Ordering,
    };
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn always_failing_operation_runs_max_attempts_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), String> = policy
            .execute(|| {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(format!("failure #{call}")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "failure #3");
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        for failures in 0..3_u32 {
            let calls = AtomicU32::new(0);
            let policy = RetryPolicy::new(3, Duration::from_secs(2));

            let result: Result<u64, String> = policy
                .execute(|| {
                    let call = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if call < failures {
                            Err("not yet".to_string())
                        } else {
                            Ok(42)
                        }
                    }
                })
                .await;

            assert_eq!(result.unwrap(), 42);
            assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_fixed_delay_between_attempts() {
        let started = Instant::now();
        let policy = RetryPolicy::new(4, Duration::from_secs(2));

        let _: Result<(), &str> = policy.execute(|| async { Err("down") }).await;

        // Three pauses between four attempts, no growth.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_invokes_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Duration::from_secs(2));

        let result: Result<(), &str> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn large_budgets_do_not_grow_the_stack() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(10_000, Duration::ZERO);

        let result: Result<(), &str> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 10_000);
    }
}
