//! Delivery worker orchestration
//!
//! The worker sleeps until it is woken, then drains the queue one entry at a
//! time until the store reports no pending entry, and goes back to sleep.

pub mod handle;
pub mod process;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use herald_common::internal;
use herald_queue::QueueStore;
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use self::{
    handle::{WakeSignal, WorkerHandle},
    process::StepOutcome,
};
use crate::{policy::RetryPolicy, transport::MailTransport};

const fn default_max_attempts() -> u32 {
    herald_queue::MAX_ATTEMPTS
}

const fn default_store_timeout() -> u64 {
    5
}

/// Delivery worker settings
///
/// With the default `max_attempts` ([`herald_queue::MAX_ATTEMPTS`]) an entry
/// never records more than three failed attempts and reaches `Error` exactly
/// at the third. Any other value moves both bounds to that value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeliveryConfig {
    /// Failed attempts before an entry is marked `Error`; the bound on
    /// `QueueEntry::attempts` for every entry this worker handles
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Deadline for every store call made by the worker (in seconds)
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            store_timeout_secs: default_store_timeout(),
        }
    }
}

/// Background task delivering pending queue entries
///
/// Exactly one worker may run against a given store: fetching the next
/// pending entry does not claim it.
#[derive(Debug)]
pub struct DeliveryWorker {
    store: Arc<dyn QueueStore>,
    transport: Arc<dyn MailTransport>,
    policy: RetryPolicy,
    store_timeout: Duration,
}

impl DeliveryWorker {
    #[must_use]
    pub fn new(
        store: Arc<dyn QueueStore>,
        transport: Arc<dyn MailTransport>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            store,
            transport,
            policy: RetryPolicy::new(config.max_attempts),
            store_timeout: Duration::from_secs(config.store_timeout_secs),
        }
    }

    /// Start the worker on the current tokio runtime
    ///
    /// The worker is woken once right away, so entries left pending by a
    /// previous run are picked up without waiting for a producer.
    #[must_use]
    pub fn spawn(self) -> WorkerHandle {
        let (wake_tx, wake_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel();
        let (ack_tx, ack_rx) = oneshot::channel();
        let stopped = Arc::new(AtomicBool::new(false));

        let wake = WakeSignal::new(wake_tx);
        wake.wake();

        let task = tokio::spawn(self.serve(wake_rx, stop_rx, ack_tx, Arc::clone(&stopped)));

        WorkerHandle::new(wake, stopped, stop_tx, ack_rx, task)
    }

    async fn serve(
        self,
        mut wake_rx: mpsc::Receiver<()>,
        mut stop_rx: oneshot::Receiver<()>,
        ack_tx: oneshot::Sender<()>,
        stopped: Arc<AtomicBool>,
    ) {
        internal!(
            level = INFO,
            "Delivery worker started (max_attempts={}, store_timeout={:?})",
            self.policy.max_attempts,
            self.store_timeout
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut stop_rx => {
                    internal!("Delivery worker received stop signal");
                    break;
                }
                woken = wake_rx.recv() => {
                    if woken.is_none() {
                        break;
                    }
                    internal!("Delivery worker woken");
                    self.drain(&stopped).await;
                }
            }
        }

        let _ = ack_tx.send(());
    }

    /// Run steps until there is no more work or a stop was requested
    async fn drain(&self, stopped: &AtomicBool) {
        let mut delivered = 0_usize;

        while !stopped.load(Ordering::Acquire) {
            match self.step().await {
                StepOutcome::Delivered => delivered += 1,
                StepOutcome::Idle => break,
            }

            // Store calls may complete without ever returning to the scheduler
            tokio::task::yield_now().await;
        }

        tracing::debug!(delivered, "Delivery worker going back to sleep");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_config_defaults() {
        let config: DeliveryConfig = ron::from_str("()").expect("Failed to parse");
        assert_eq!(config, DeliveryConfig::default());
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.store_timeout_secs, 5);
    }

    #[test]
    fn test_default_config_gives_up_at_the_third_failure() {
        use herald_queue::{MailingStatus, QueueEntry};

        use crate::{
            error::{PermanentError, TransportError},
            processor::process::apply_delivery_result,
            transport::PartialDeliveryFailure,
        };

        let policy = RetryPolicy::new(DeliveryConfig::default().max_attempts);
        let mut entry = QueueEntry::new(["a@example.com"], "Subject", "Body");

        while !entry.status.is_terminal() {
            let mut failure = PartialDeliveryFailure::default();
            failure.push(
                &entry,
                0,
                TransportError::from(PermanentError::Rejected("550".to_string())),
            );
            entry = apply_delivery_result(entry, Err(&failure), &policy);
            assert!(entry.attempts <= herald_queue::MAX_ATTEMPTS);
        }

        assert_eq!(entry.status, MailingStatus::Error);
        assert_eq!(entry.attempts, 3);
    }

    #[test]
    fn test_delivery_config_overrides() {
        let config: DeliveryConfig =
            ron::from_str("(max_attempts: 5, store_timeout_secs: 1)").expect("Failed to parse");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.store_timeout_secs, 1);
    }
}
