//! Exponential backoff for backend subprocess calls.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::debug;

/// 3 total attempts, base 1s, max 30s.
pub const MAX_ATTEMPTS: u32 = 3;
const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// Retry an async operation with exponential backoff.
///
/// `attempt` runs up to [`MAX_ATTEMPTS`] times while `is_transient` says the
/// failure is worth retrying. A permanent failure is returned as-is on the
/// spot; running out of attempts hands the last error to `wrap_exhausted`.
pub async fn retry_with_backoff<T, E, Fut, F, P, W>(
    mut attempt: F,
    is_transient: P,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    W: FnOnce(E) -> E,
    E: std::fmt::Display,
{
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempts = 1;
    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !is_transient(&err) {
            return Err(err);
        }
        if attempts >= MAX_ATTEMPTS {
            return Err(wrap_exhausted(err));
        }

        debug!("Attempt {}/{} failed: {}", attempts, MAX_ATTEMPTS, err);
        if let Some(wait) = backoff.next_backoff() {
            tokio::time::sleep(wait).await;
        }
        attempts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Permanent,
        RetriesExhausted(Box<TestError>),
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn transient(e: &TestError) -> bool {
        *e == TestError::Transient
    }

    fn exhausted(e: TestError) -> TestError {
        TestError::RetriesExhausted(Box::new(e))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success() {
        let result: Result<&str, TestError> =
            retry_with_backoff(|| async { Ok("ok") }, transient, exhausted).await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let result: Result<(), TestError> = retry_with_backoff(
            move || {
                let c = counter.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Transient)
                }
            },
            transient,
            exhausted,
        )
        .await;

        assert_eq!(
            result.unwrap_err(),
            TestError::RetriesExhausted(Box::new(TestError::Transient))
        );
        assert_eq!(count.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let result: Result<(), TestError> = retry_with_backoff(
            move || {
                let c = counter.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Permanent)
                }
            },
            transient,
            exhausted,
        )
        .await;

        assert_eq!(result.unwrap_err(), TestError::Permanent);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let result: Result<&str, TestError> = retry_with_backoff(
            move || {
                let c = counter.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok("recovered")
                    }
                }
            },
            transient,
            exhausted,
        )
        .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
