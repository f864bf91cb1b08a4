use std::{future::Future, time::Duration};

use async_trait::async_trait;

use crate::{EntryId, PersistenceError, QueueEntry};

/// Storage abstraction for queue entries
///
/// Implementations must be safe to share between the HTTP handlers and the
/// delivery worker. Every operation either completes or fails as a whole; a
/// failed `save` leaves the previously stored version untouched.
#[async_trait]
pub trait QueueStore: Send + Sync + std::fmt::Debug {
    /// Look up a single entry
    ///
    /// # Errors
    ///
    /// `QueueError::NotFound` if no entry has this id.
    async fn find(&self, id: &EntryId) -> crate::Result<QueueEntry>;

    /// List entries newest first, skipping `skip` and returning at most `limit`
    async fn find_page(&self, skip: usize, limit: usize) -> crate::Result<Vec<QueueEntry>>;

    /// Total number of stored entries, in any status
    async fn count(&self) -> crate::Result<usize>;

    /// Create or update an entry
    ///
    /// The store stamps `timestamp` with the current time before writing, and
    /// assigns a fresh id when `entry.id` is `None`. The stamped entry is
    /// returned.
    ///
    /// # Errors
    ///
    /// `QueueError::NotFound` when updating an id that does not exist.
    async fn save(&self, entry: QueueEntry) -> crate::Result<QueueEntry>;

    /// The pending entry with the oldest timestamp, if any
    async fn take_next_pending(&self) -> crate::Result<Option<QueueEntry>>;
}

/// Run a store operation with a deadline
///
/// An expired deadline surfaces as a persistence timeout, which callers handle
/// exactly like any other store failure.
///
/// # Errors
///
/// Whatever `operation` fails with, or `PersistenceError::Timeout` if it did
/// not finish within `deadline`.
pub async fn with_deadline<T, F>(deadline: Duration, operation: F) -> crate::Result<T>
where
    F: Future<Output = crate::Result<T>> + Send,
{
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| PersistenceError::Timeout(deadline))?
}
