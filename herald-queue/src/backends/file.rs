use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use herald_common::internal;
use tokio::{fs, sync::Mutex};

use super::index::QueueIndex;
use crate::{EntryId, QueueEntry, QueueError, QueueStore, SerializationError, ValidationError};

const SENSITIVE_PREFIXES: [&str; 9] = [
    "/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev",
];

/// File-backed queue store
///
/// Each entry is stored as `{id}.bin` in the queue directory, encoded with
/// bincode. Writes go to `{id}.bin.tmp` first and are renamed into place, so a
/// crash mid-write leaves the previous version intact. Leftover `.tmp` files
/// are removed when the store is opened.
///
/// The whole queue is also held in memory: [`FileQueueStore::open`] reads every
/// entry file once and all lookups are answered from that index afterwards.
/// Saves are serialized so the index and the directory never disagree.
#[derive(Debug, Clone)]
pub struct FileQueueStore {
    path: PathBuf,
    index: Arc<RwLock<QueueIndex>>,
    writer: Arc<Mutex<()>>,
}

impl FileQueueStore {
    /// Open (and create, if needed) a queue directory
    ///
    /// Entry files that cannot be decoded are skipped with a warning and left
    /// on disk for inspection.
    ///
    /// # Errors
    /// Returns an error if the path fails validation, the directory cannot be
    /// created, or it cannot be listed.
    pub async fn open(path: impl Into<PathBuf>) -> crate::Result<Self> {
        let path = path.into();
        validate_path(&path)?;

        fs::create_dir_all(&path).await?;
        if !fs::metadata(&path).await?.is_dir() {
            return Err(ValidationError::NotDirectory(path.display().to_string()).into());
        }

        let mut index = QueueIndex::default();
        let mut cleaned = 0;
        let mut dir = fs::read_dir(&path).await?;

        while let Some(file) = dir.next_entry().await? {
            let filename = file.file_name();
            let filename = filename.to_string_lossy();

            if filename.ends_with(".tmp") {
                fs::remove_file(file.path()).await?;
                cleaned += 1;
                continue;
            }

            let Some(id) = EntryId::from_filename(&filename) else {
                continue;
            };

            match read_entry(&file.path(), &id).await {
                Ok(entry) => index.upsert(id, entry),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "Skipping unreadable queue entry");
                }
            }
        }

        if cleaned > 0 {
            internal!(
                level = INFO,
                "Cleaned up {cleaned} interrupted writes from {}",
                path.display()
            );
        }
        internal!(
            level = INFO,
            "Opened queue at {} with {} entries",
            path.display(),
            index.len()
        );

        Ok(Self {
            path,
            index: Arc::new(RwLock::new(index)),
            writer: Arc::default(),
        })
    }

    fn entry_path(&self, id: &EntryId) -> PathBuf {
        self.path.join(id.filename())
    }
}

/// Validate a queue path for security
///
/// # Security Checks
/// - Rejects paths containing `..` (directory traversal)
/// - Ensures the path is absolute
/// - Rejects paths to sensitive system directories
fn validate_path(path: &Path) -> Result<(), ValidationError> {
    if path
        .components()
        .any(|component| component == std::path::Component::ParentDir)
    {
        return Err(ValidationError::ParentTraversal(path.display().to_string()));
    }

    if !path.is_absolute() {
        return Err(ValidationError::RelativePath(path.display().to_string()));
    }

    if SENSITIVE_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        return Err(ValidationError::SystemDirectory(path.display().to_string()));
    }

    Ok(())
}

async fn read_entry(path: &Path, id: &EntryId) -> crate::Result<QueueEntry> {
    let bytes = fs::read(path).await?;
    let (entry, _): (QueueEntry, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(SerializationError::from)?;

    if entry.id.as_ref() != Some(id) {
        return Err(SerializationError::Corrupted(format!(
            "{} does not hold entry {id}",
            path.display()
        ))
        .into());
    }

    Ok(entry)
}

#[async_trait]
impl QueueStore for FileQueueStore {
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

    /// Persist an entry with a write-to-temp-then-rename
    ///
    /// The in-memory index is only updated after the rename succeeded.
    async fn save(&self, mut entry: QueueEntry) -> crate::Result<QueueEntry> {
        let _writer = self.writer.lock().await;

        let id = {
            let mut index = self.index.write()?;
            let id = match entry.id.clone() {
                Some(id) if index.contains(&id) => id,
                Some(id) => return Err(QueueError::NotFound(id)),
                None => EntryId::generate(),
            };
            entry.timestamp = index.stamp();
            id
        };
        entry.id = Some(id.clone());

        let bytes = bincode::serde::encode_to_vec(&entry, bincode::config::standard())
            .map_err(SerializationError::from)?;

        let path = self.entry_path(&id);
        let temp_path = path.with_extension("bin.tmp");
        fs::write(&temp_path, &bytes).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        self.index.write()?.upsert(id, entry.clone());

        Ok(entry)
    }

    async fn take_next_pending(&self) -> crate::Result<Option<QueueEntry>> {
        Ok(self.index.read()?.oldest_pending().cloned())
    }
}
