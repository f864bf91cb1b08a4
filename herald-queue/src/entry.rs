//! The unit of work: one mailing plus its delivery state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntryId;

/// Number of failed delivery attempts after which an entry is given up on.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delivery state of a queue entry.
///
/// `Done` and `Error` are terminal: the worker never picks those entries up
/// again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MailingStatus {
    #[default]
    Pending,
    Done,
    Error,
}

impl MailingStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl std::fmt::Display for MailingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Done => "Done",
            Self::Error => "Error",
        })
    }
}

/// A single destination address with its own delivered flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    #[serde(alias = "addr")]
    pub address: String,
    #[serde(default)]
    pub delivered: bool,
}

impl Receiver {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            delivered: false,
        }
    }
}

/// A mailing and its delivery state.
///
/// `id` is `None` until the entry is first saved; saving an entry without an id
/// creates it, saving one with an id updates it in place. `timestamp` is owned
/// by the store and overwritten on every save: it orders pending entries
/// (oldest first) and records the last mutation once the entry is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Option<EntryId>,
    pub receivers: Vec<Receiver>,
    pub subject: String,
    #[serde(alias = "text")]
    pub body: String,
    pub status: MailingStatus,
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
}

impl QueueEntry {
    /// Create a fresh pending entry with every receiver undelivered
    #[must_use]
    pub fn new<I, S>(receivers: I, subject: impl Into<String>, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            receivers: receivers.into_iter().map(Receiver::new).collect(),
            subject: subject.into(),
            body: body.into(),
            status: MailingStatus::Pending,
            attempts: 0,
            timestamp: Utc::now(),
        }
    }

    /// Whether this entry has never been persisted
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Positions of receivers still waiting for a successful delivery
    #[must_use]
    pub fn undelivered_positions(&self) -> Vec<usize> {
        self.receivers
            .iter()
            .enumerate()
            .filter(|(_, receiver)| !receiver.delivered)
            .map(|(position, _)| position)
            .collect()
    }
}
