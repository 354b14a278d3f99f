//! Bounded retry with fixed delay for remote calls.

use std::future::Future;
use std::time::Duration;

use log::warn;

use super::error::{MailboxError, Result};

/// Default number of attempts per remote call.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default fixed delay between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

/// Wraps a remote call with bounded retry and a fixed delay between
/// attempts. This is best-effort smoothing over transient network and auth
/// failures, not a circuit breaker: no exponential backoff, no jitter.
///
/// The `retry_if` predicate decides which errors are worth another attempt;
/// the default retries everything.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
    retry_if: fn(&MailboxError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }
}

fn retry_all(_err: &MailboxError) -> bool {
    true
}

impl RetryPolicy {
    /// Creates a policy with the given attempt count and fixed delay.
    /// Attempt counts below 1 are treated as 1.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
            retry_if: retry_all,
        }
    }

    /// Replaces the retryable-error predicate. Errors for which the
    /// predicate returns false propagate immediately without further
    /// attempts.
    pub fn with_retry_if(mut self, retry_if: fn(&MailboxError) -> bool) -> Self {
        self.retry_if = retry_if;
        self
    }

    /// Number of configured attempts.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Fixed delay between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Executes `op`, retrying failed attempts until the configured count
    /// is exhausted. Non-final failures are logged and swallowed; the final
    /// error is propagated to the caller.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.attempts && (self.retry_if)(&err) => {
                    warn!(
                        "{} attempt {}/{} failed, retrying: {}",
                        label, attempt, self.attempts, err
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = quick(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42u32) }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = quick(3)
            .run("op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(MailboxError::Transport("connection reset".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_final_error_propagates() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = quick(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(MailboxError::Transport("still down".into())) }
            })
            .await;
        assert!(matches!(result, Err(MailboxError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let policy = quick(5).with_retry_if(|e| !matches!(e, MailboxError::Config(_)));
        let result: Result<()> = policy
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(MailboxError::Config("bad mailbox".into())) }
            })
            .await;
        assert!(matches!(result, Err(MailboxError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_clamped_to_one() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = quick(0)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(MailboxError::Transport("down".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
