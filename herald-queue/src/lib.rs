//! Durable queue of mailings awaiting delivery.
//!
//! The queue is a keyed collection of [`QueueEntry`] values behind the
//! [`QueueStore`] trait. Besides point lookups and paged listing, a store can
//! hand out the oldest pending entry, which is what turns it into a work queue
//! for the delivery worker.

pub mod backends;
pub mod config;
pub mod entry;
pub mod error;
pub mod store;
pub mod types;

pub use backends::{FileQueueStore, MemoryQueueStore};
pub use config::QueueConfig;
pub use entry::{MAX_ATTEMPTS, MailingStatus, QueueEntry, Receiver};
pub use error::{PersistenceError, QueueError, Result, SerializationError, ValidationError};
pub use store::{QueueStore, with_deadline};
pub use types::EntryId;
