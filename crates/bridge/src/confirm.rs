//! Bounded confirmation polling for submitted burns.
//!
//! Burn submission returns as soon as the transaction is accepted; this
//! module watches it until the chain reports a terminal state or the
//! deadline passes. The poll is advisory: a timeout leaves the transfer
//! pending rather than failing it, since the attestation service is the
//! authority on whether the burn happened.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::CctpError;

/// Chain-side view of a submitted burn transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurnStatus {
    /// Not yet visible, or visible without enough depth.
    Unconfirmed,
    /// Executed successfully.
    Confirmed,
    /// Included but reverted or errored.
    Failed { reason: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmPollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }
}

/// How a bounded confirmation poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    Failed { reason: Option<String> },
    /// Deadline elapsed with the transaction still unconfirmed.
    TimedOut,
    /// The cancel channel flipped, or its sender went away.
    Cancelled,
}

/// Polls `probe` until the burn confirms, fails, times out, or `cancel`
/// becomes true. Probe errors are logged and treated as not-yet-confirmed;
/// the chain may simply be behind.
pub async fn poll_until_confirmed<F, Fut>(
    mut probe: F,
    config: ConfirmPollConfig,
    mut cancel: watch::Receiver<bool>,
) -> ConfirmOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<BurnStatus, CctpError>>,
{
    let deadline = Instant::now() + config.timeout;
    loop {
        if *cancel.borrow() {
            info!("Confirmation poll cancelled");
            return ConfirmOutcome::Cancelled;
        }

        match probe().await {
            Ok(BurnStatus::Confirmed) => {
                info!("Burn transaction confirmed");
                return ConfirmOutcome::Confirmed;
            }
            Ok(BurnStatus::Failed { reason }) => {
                warn!(?reason, "Burn transaction failed on chain");
                return ConfirmOutcome::Failed { reason };
            }
            Ok(BurnStatus::Unconfirmed) => {
                debug!("Burn transaction not confirmed yet");
            }
            Err(err) => {
                warn!(%err, "Confirmation probe failed, will retry");
            }
        }

        if Instant::now() + config.interval > deadline {
            warn!(timeout_secs = config.timeout.as_secs(), "Confirmation poll deadline reached");
            return ConfirmOutcome::TimedOut;
        }
        tokio::select! {
            () = sleep(config.interval) => {}
            changed = cancel.changed() => {
                if changed.is_err() {
                    info!("Confirmation poll owner dropped, stopping");
                    return ConfirmOutcome::Cancelled;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    fn fast_config() -> ConfirmPollConfig {
        ConfirmPollConfig {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(500),
        }
    }

    struct Script {
        calls: AtomicUsize,
        results: Mutex<VecDeque<Result<BurnStatus, CctpError>>>,
    }

    impl Script {
        fn new(results: Vec<Result<BurnStatus, CctpError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                results: Mutex::new(results.into()),
            })
        }

        fn probe(self: &Arc<Self>) -> impl FnMut() -> ProbeFuture {
            let script = self.clone();
            move || {
                let script = script.clone();
                Box::pin(async move {
                    script.calls.fetch_add(1, Ordering::SeqCst);
                    script
                        .results
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or(Ok(BurnStatus::Unconfirmed))
                })
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    type ProbeFuture =
        std::pin::Pin<Box<dyn Future<Output = Result<BurnStatus, CctpError>> + Send>>;

    #[tokio::test]
    async fn confirms_after_pending_probes() {
        let script = Script::new(vec![
            Ok(BurnStatus::Unconfirmed),
            Ok(BurnStatus::Unconfirmed),
            Ok(BurnStatus::Confirmed),
        ]);
        let (_cancel, rx) = watch::channel(false);
        let outcome = poll_until_confirmed(script.probe(), fast_config(), rx).await;
        assert_eq!(outcome, ConfirmOutcome::Confirmed);
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn failure_is_terminal() {
        let script = Script::new(vec![Ok(BurnStatus::Failed {
            reason: Some("transaction reverted".into()),
        })]);
        let (_cancel, rx) = watch::channel(false);
        let outcome = poll_until_confirmed(script.probe(), fast_config(), rx).await;
        assert_eq!(
            outcome,
            ConfirmOutcome::Failed {
                reason: Some("transaction reverted".into())
            }
        );
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn probe_errors_are_tolerated() {
        let script = Script::new(vec![
            Err(CctpError::MalformedMessage),
            Ok(BurnStatus::Confirmed),
        ]);
        let (_cancel, rx) = watch::channel(false);
        let outcome = poll_until_confirmed(script.probe(), fast_config(), rx).await;
        assert_eq!(outcome, ConfirmOutcome::Confirmed);
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test]
    async fn times_out_while_unconfirmed() {
        let script = Script::new(vec![]);
        let config = ConfirmPollConfig {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(20),
        };
        let (_cancel, rx) = watch::channel(false);
        let outcome = poll_until_confirmed(script.probe(), config, rx).await;
        assert_eq!(outcome, ConfirmOutcome::TimedOut);
        assert!(script.calls() >= 1);
    }

    #[tokio::test]
    async fn cancellation_before_the_first_probe_skips_it() {
        let script = Script::new(vec![]);
        let (_cancel, rx) = watch::channel(true);
        let outcome = poll_until_confirmed(script.probe(), fast_config(), rx).await;
        assert_eq!(outcome, ConfirmOutcome::Cancelled);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_wakes_the_sleep() {
        let script = Script::new(vec![]);
        let (tx, rx) = watch::channel(false);
        let config = ConfirmPollConfig {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(120),
        };
        let poll = tokio::spawn(poll_until_confirmed(script.probe(), config, rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        let outcome = poll.await.unwrap();
        assert_eq!(outcome, ConfirmOutcome::Cancelled);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn dropped_sender_stops_the_poll() {
        let script = Script::new(vec![]);
        let (tx, rx) = watch::channel(false);
        let config = ConfirmPollConfig {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(120),
        };
        let poll = tokio::spawn(poll_until_confirmed(script.probe(), config, rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(tx);
        let outcome = poll.await.unwrap();
        assert_eq!(outcome, ConfirmOutcome::Cancelled);
    }
}
