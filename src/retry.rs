//! Retry policy for network-bound calls
//!
//! Fixed attempt count, fixed sleep between attempts. No backoff, no jitter.

use crate::error::{Result, SyncError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, first call included. Zero runs once.
    pub max_attempts: usize,
    /// Sleep between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Single attempt, no sleep.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error: Option<SyncError> = None;

        for attempt in 1..=attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        if attempts == 1 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Err(SyncError::RetriesExhausted {
            attempts,
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failure() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = policy
            .run("flaky call", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(SyncError::Network("503".to_string()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_exhausted_reports_attempts() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<()> = policy
            .run("always failing", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SyncError::Network("429".to_string()))
                }
            })
            .await;

        match result {
            Err(SyncError::RetriesExhausted { attempts: n, last }) => {
                assert_eq!(n, 3);
                assert!(last.contains("429"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<()> = policy
            .run("resolution", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SyncError::MissingAttributes {
                        required: vec!["Platform".to_string()],
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(SyncError::MissingAttributes { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        for policy in [
            RetryPolicy::new(0, Duration::ZERO),
            RetryPolicy {
                max_attempts: 0,
                delay: Duration::ZERO,
            },
        ] {
            let attempts = Arc::new(AtomicUsize::new(0));
            let counter = attempts.clone();

            let result: Result<()> = policy
                .run("zero budget", move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(SyncError::Network("503".to_string()))
                    }
                })
                .await;

            assert!(matches!(result, Err(SyncError::Network(_))));
            assert_eq!(attempts.load(Ordering::SeqCst), 1);
        }
    }
}
