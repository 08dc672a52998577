// Retry loop for transaction bodies that can fail on transient lock contention.
//
// Each attempt is handed the attempt number and must open (and commit) its own
// transaction, so a retried attempt never observes state from a rolled back one.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Errors that can tell whether repeating the same work may succeed
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Attempt cap and exponential backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Sleep taken after the given (1-based) failed attempt: base, 2*base, 4*base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

/// Outcome of a retried operation that did not succeed
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed transiently
    Exhausted { attempts: u32, last: E },
    /// A non-transient failure stopped the loop immediately
    Aborted(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "still contended after {} attempts: {}", attempts, last)
            }
            RetryError::Aborted(err) => write!(f, "{}", err),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Aborted(err) => Some(err),
        }
    }
}

/// Run `op` until it succeeds, fails non-transiently, or the policy's attempt
/// cap is reached. Sleeps `policy.delay_after(n)` between attempts.
pub async fn retry_transient<T, E, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() => {
                if attempt >= policy.max_attempts() {
                    tracing::warn!(
                        operation,
                        attempts = attempt,
                        error = %err,
                        "giving up after transient failures"
                    );
                    return Err(RetryError::Exhausted { attempts: attempt, last: err });
                }
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(RetryError::Aborted(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Debug)]
    enum FakeError {
        LockWait,
        Broken,
    }

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, FakeError::LockWait)
        }
    }

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::new(3, Duration::from_millis(200));
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
        assert_eq!(policy.delay_after(3), Duration::from_millis(800));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_lock_wait_stops_after_three_attempts() {
        let started = Instant::now();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let result: Result<(), _> = retry_transient(RetryPolicy::default(), "test", |attempt| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push((attempt, started.elapsed()));
                Err(FakeError::LockWait)
            }
        })
        .await;

        match result {
            Err(RetryError::Exhausted {
                attempts,
                last: FakeError::LockWait,
            }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other),
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        let gaps: Vec<Duration> = seen.windows(2).map(|w| w[1].1 - w[0].1).collect();
        assert_eq!(gaps, vec![Duration::from_millis(200), Duration::from_millis(400)]);
        assert!(gaps[1] > gaps[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_error_aborts_without_retry() {
        let calls = Arc::new(Mutex::new(0u32));
        let result: Result<(), _> = retry_transient(RetryPolicy::default(), "test", |_| {
            let calls = calls.clone();
            async move {
                *calls.lock().unwrap() += 1;
                Err(FakeError::Broken)
            }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Aborted(FakeError::Broken))));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_when_lock_clears() {
        let result = retry_transient(RetryPolicy::default(), "test", |attempt| async move {
            if attempt < 2 {
                Err(FakeError::LockWait)
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }
}
