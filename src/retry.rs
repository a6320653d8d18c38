//! Bounded retry for one-shot network operations.
//!
//! Polling loops (attestation wait, burn confirmation) own their own cadence;
//! this helper is for single RPC or HTTP calls that may fail transiently. The
//! caller supplies a gate deciding which failures are worth retrying, so user
//! cancellations and validation failures abort on the first occurrence.

use std::cell::Cell;
use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use thiserror::Error;
use tracing::warn;

/// Backoff policy: an initial attempt plus up to `max_retries` retries,
/// delayed `base_delay * 2^n` before retry `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted { attempts: usize, source: E },
    /// The gate declined to retry; the failure is returned unchanged.
    #[error(transparent)]
    Aborted(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { source, .. } | Self::Aborted(source) => source,
        }
    }

    pub const fn attempts(&self) -> usize {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Aborted(_) => 1,
        }
    }
}

/// Runs `operation`, retrying failures that pass `should_retry` under the
/// given policy.
///
/// The gate is consulted on every failure; a failure it declines (a user
/// rejection, a deterministic revert) aborts immediately even mid-sequence.
/// Exhaustion reports how many attempts were made in total.
pub async fn with_retry<T, E, F, Fut, C>(
    operation: F,
    policy: RetryPolicy,
    should_retry: C,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    C: Fn(&E) -> bool,
{
    let strategy = ExponentialBuilder::default()
        .with_min_delay(policy.base_delay)
        .with_max_times(policy.max_retries);

    let retried = Cell::new(0_usize);
    let outcome = operation
        .retry(strategy)
        .when(&should_retry)
        .notify(|err, delay| {
            retried.set(retried.get() + 1);
            warn!(%err, ?delay, retry = retried.get(), "transient failure, retrying");
        })
        .await;

    match outcome {
        Ok(value) => Ok(value),
        Err(source) if should_retry(&source) => Err(RetryError::Exhausted {
            attempts: retried.get() + 1,
            source,
        }),
        Err(source) => Err(RetryError::Aborted(source)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Error)]
    enum FakeError {
        #[error("connection reset by peer")]
        Transient,
        #[error("User rejected the request")]
        Rejected,
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn only_transient(err: &FakeError) -> bool {
        matches!(err, FakeError::Transient)
    }

    #[tokio::test]
    async fn first_success_makes_no_retries() {
        let calls = AtomicUsize::new(0);

        let result = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FakeError>(7)
            },
            fast(),
            only_transient,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = AtomicUsize::new(0);

        let result = with_retry(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(FakeError::Transient)
                } else {
                    Ok(42)
                }
            },
            fast(),
            only_transient,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_total_attempts() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Transient)
            },
            fast(),
            only_transient,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4, "initial attempt plus three retries");
        match result.unwrap_err() {
            RetryError::Exhausted { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejections_abort_on_the_first_attempt() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Rejected)
            },
            fast(),
            only_transient,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), RetryError::Aborted(FakeError::Rejected)));
    }

    #[tokio::test]
    async fn a_rejection_mid_sequence_stops_the_retries() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = with_retry(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(FakeError::Transient)
                } else {
                    Err(FakeError::Rejected)
                }
            },
            fast(),
            only_transient,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result.unwrap_err(), RetryError::Aborted(FakeError::Rejected)));
    }
}
