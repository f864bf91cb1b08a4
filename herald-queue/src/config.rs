use std::{path::PathBuf, sync::Arc};

use serde::Deserialize;

use crate::{FileQueueStore, MemoryQueueStore, QueueStore};

/// Configuration for the queue backing store
///
/// # Examples
///
/// File-backed queue in RON config:
/// ```ron
/// Herald (
///     queue: File(
///         path: "/var/spool/herald",
///     ),
/// )
/// ```
///
/// Memory-backed queue with a capacity limit:
/// ```ron
/// Herald (
///     queue: Memory(
///         capacity: Some(1000),
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum QueueConfig {
    /// One file per entry under `path` (production)
    File { path: PathBuf },
    /// Nothing survives a restart (testing/development)
    Memory {
        #[serde(default)]
        capacity: Option<usize>,
    },
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::File {
            path: PathBuf::from("/var/spool/herald"),
        }
    }
}

impl QueueConfig {
    /// Get the filesystem path for file-backed queues, if applicable
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File { path } => Some(path),
            Self::Memory { .. } => None,
        }
    }

    /// Build the configured store
    ///
    /// # Errors
    /// Returns an error if a file-backed queue cannot be opened.
    pub async fn into_store(self) -> crate::Result<Arc<dyn QueueStore>> {
        Ok(match self {
            Self::File { path } => Arc::new(FileQueueStore::open(path).await?),
            Self::Memory { capacity } => capacity.map_or_else(
                || Arc::new(MemoryQueueStore::new()) as Arc<dyn QueueStore>,
                |capacity| Arc::new(MemoryQueueStore::with_capacity(capacity)),
            ),
        })
    }
}
