//! A single delivery step and the retry state machine

use herald_queue::{MailingStatus, QueueEntry, with_deadline};
use tracing::{debug, error, info, warn};

use crate::{policy::RetryPolicy, processor::DeliveryWorker, transport::PartialDeliveryFailure};

/// What one step of the worker accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An entry was attempted; look for more. Its new state may not have
    /// been persisted, in which case it is picked up again as it was.
    Delivered,
    /// Nothing to do, or the next entry could not be fetched; wait for a wake.
    Idle,
}

/// Fold the result of one delivery attempt into the entry
///
/// Every receiver that was outstanding before the attempt is marked
/// delivered, then the reported failures are rolled back. A failure for a
/// position that was not part of the attempt is ignored. If at least one
/// attempted receiver failed, `attempts` goes up by one and the entry either
/// stays `Pending` or, once the policy is exhausted, becomes `Error`;
/// otherwise it is `Done`.
#[must_use]
pub fn apply_delivery_result(
    mut entry: QueueEntry,
    result: Result<(), &PartialDeliveryFailure>,
    policy: &RetryPolicy,
) -> QueueEntry {
    let attempted = entry.undelivered_positions();
    for &position in &attempted {
        entry.receivers[position].delivered = true;
    }

    let mut failed = 0;
    if let Err(failure) = result {
        for position in failure.positions() {
            if attempted.contains(&position) {
                entry.receivers[position].delivered = false;
                failed += 1;
            } else {
                warn!(
                    entry_id = ?entry.id,
                    position,
                    "Ignoring failure for a receiver that was not attempted"
                );
            }
        }
    }

    if failed == 0 {
        entry.status = MailingStatus::Done;
    } else {
        entry.attempts = entry.attempts.saturating_add(1);
        entry.status = if policy.should_retry(entry.attempts) {
            MailingStatus::Pending
        } else {
            MailingStatus::Error
        };
    }

    entry
}

impl DeliveryWorker {
    /// Attempt the oldest pending entry and persist the outcome
    pub(crate) async fn step(&self) -> StepOutcome {
        let entry = match with_deadline(self.store_timeout, self.store.take_next_pending()).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("No pending entries");
                return StepOutcome::Idle;
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch next pending entry");
                return StepOutcome::Idle;
            }
        };

        let Some(id) = entry.id.clone() else {
            error!("Store returned an entry without an id");
            return StepOutcome::Idle;
        };

        debug!(entry_id = %id, attempts = entry.attempts, "Attempting delivery");
        let result = self.transport.deliver(&entry).await;

        if let Err(failure) = &result {
            for failed in &failure.failures {
                warn!(
                    entry_id = %id,
                    receiver = %failed.address,
                    position = failed.position,
                    error = %failed.error,
                    "Receiver not delivered"
                );
            }
        }

        let updated = apply_delivery_result(entry, result.as_ref().map(|_| ()), &self.policy);
        let (status, attempts) = (updated.status, updated.attempts);

        match with_deadline(self.store_timeout, self.store.save(updated)).await {
            Ok(_) => {
                info!(entry_id = %id, %status, attempts, "Delivery attempt recorded");
                StepOutcome::Delivered
            }
            Err(e) => {
                error!(entry_id = %id, error = %e, "Failed to persist delivery result");
                StepOutcome::Delivered
            }
        }
    }
}
