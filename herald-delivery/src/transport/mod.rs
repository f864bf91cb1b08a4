//! Mail transports
//!
//! A [`MailTransport`] attempts delivery of one queue entry to each of its
//! undelivered receivers and reports which of them failed. Failures are
//! reported per receiver position so the worker can correlate them back to
//! the entry; one receiver failing never stops the others from being tried.

mod log;
mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use herald_queue::QueueEntry;
use serde::Deserialize;

pub use self::{
    log::LogTransport,
    smtp::{SmtpConfig, SmtpTransport, TlsMode},
};
use crate::error::TransportError;

/// A receiver the transport could not deliver to.
#[derive(Debug, Clone)]
pub struct FailedReceiver {
    /// Index into `QueueEntry::receivers`
    pub position: usize,
    pub address: String,
    pub error: TransportError,
}

/// One or more receivers of an entry failed during a delivery attempt.
#[derive(Debug, Clone, Default, thiserror::Error)]
#[error("{} receiver(s) failed", .failures.len())]
pub struct PartialDeliveryFailure {
    pub failures: Vec<FailedReceiver>,
}

impl PartialDeliveryFailure {
    /// Record a failure for the receiver at `position`
    pub fn push(&mut self, entry: &QueueEntry, position: usize, error: TransportError) {
        let address = entry
            .receivers
            .get(position)
            .map(|receiver| receiver.address.clone())
            .unwrap_or_default();

        self.failures.push(FailedReceiver {
            position,
            address,
            error,
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Failed positions, in the order they were reported
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.failures.iter().map(|failed| failed.position)
    }

    /// `Ok(())` if nothing was recorded, otherwise `Err(self)`
    ///
    /// # Errors
    /// Returns `self` when at least one receiver failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Delivers queue entries to their receivers.
#[async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    /// Attempt delivery to every receiver with `delivered == false`
    ///
    /// # Errors
    /// Returns the failed receivers when at least one attempted receiver
    /// could not be delivered to.
    async fn deliver(&self, entry: &QueueEntry) -> Result<(), PartialDeliveryFailure>;
}

/// Transport selection
///
/// # Examples
///
/// ```ron
/// Herald (
///     transport: Smtp(
///         host: "smtp.example.com",
///         port: 587,
///         tls: StartTls,
///         from_address: "noreply@example.com",
///     ),
/// )
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub enum TransportConfig {
    /// Relay through an SMTP server
    Smtp(SmtpConfig),
    /// Log every delivery and report success
    #[default]
    Log,
}

impl TransportConfig {
    /// Build the configured transport
    ///
    /// # Errors
    /// Returns an error if the SMTP configuration is unusable (bad sender
    /// address, TLS parameters).
    pub fn into_transport(self) -> Result<Arc<dyn MailTransport>, TransportError> {
        Ok(match self {
            Self::Smtp(config) => Arc::new(SmtpTransport::new(&config)?),
            Self::Log => Arc::new(LogTransport),
        })
    }
}
