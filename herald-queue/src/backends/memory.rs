use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::index::QueueIndex;
use crate::{EntryId, PersistenceError, QueueEntry, QueueError, QueueStore};

/// In-memory queue store
///
/// Entries live in a [`QueueIndex`] behind an `RwLock`. Nothing survives a
/// restart, so this is meant for tests and development setups.
///
/// # Capacity Management
/// An optional capacity bounds the number of stored entries. Creating an entry
/// beyond it fails with `PersistenceError::CapacityExceeded`; updates of
/// existing entries are always accepted.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueueStore {
    index: Arc<RwLock<QueueIndex>>,
    capacity: Option<usize>,
}

impl MemoryQueueStore {
    /// Create a new empty store with unlimited capacity
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Get the current number of entries in the store
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn find(&self, id: &EntryId) -> crate::Result<QueueEntry> {
        self.index
            .read()?
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(id.clone()))
    }

    async fn find_page(&self, skip: usize, limit: usize) -> crate::Result<Vec<QueueEntry>> {
        Ok(self.index.read()?.page(skip, limit))
    }

    async fn count(&self) -> crate::Result<usize> {
        Ok(self.index.read()?.len())
    }

    async fn save(&self, mut entry: QueueEntry) -> crate::Result<QueueEntry> {
        let mut index = self.index.write()?;

        let id = match entry.id.clone() {
            Some(id) if index.contains(&id) => id,
            Some(id) => return Err(QueueError::NotFound(id)),
            None => {
                if let Some(capacity) = self.capacity
                    && index.len() >= capacity
                {
                    return Err(PersistenceError::CapacityExceeded {
                        len: index.len(),
                        capacity,
                    }
                    .into());
                }
                EntryId::generate()
            }
        };

        entry.id = Some(id.clone());
        entry.timestamp = index.stamp();
        index.upsert(id, entry.clone());

        Ok(entry)
    }

    async fn take_next_pending(&self) -> crate::Result<Option<QueueEntry>> {
        Ok(self.index.read()?.oldest_pending().cloned())
    }
}
