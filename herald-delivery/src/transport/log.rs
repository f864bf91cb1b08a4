use async_trait::async_trait;
use herald_queue::QueueEntry;

use super::{MailTransport, PartialDeliveryFailure};

/// Logs every receiver instead of sending anything
///
/// Always succeeds. Useful for development setups without a relay.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, entry: &QueueEntry) -> Result<(), PartialDeliveryFailure> {
        for position in entry.undelivered_positions() {
            tracing::info!(
                entry_id = ?entry.id,
                receiver = %entry.receivers[position].address,
                subject = %entry.subject,
                "Delivered (log transport)"
            );
        }

        Ok(())
    }
}
