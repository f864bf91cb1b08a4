//! Error types for the herald-queue crate.
//!
//! Callers only ever need to tell two things apart: the entry does not exist
//! ([`QueueError::NotFound`]) or the backing store could not complete the
//! operation ([`QueueError::Persistence`]). The latter is always treated as
//! transient by the delivery worker.

use std::{io, time::Duration};

use thiserror::Error;

use crate::EntryId;

/// Top-level queue error type.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Lookup or update target does not exist.
    #[error("Entry not found: {0}")]
    NotFound(EntryId),

    /// Backing store failure (I/O, serialization, timeout, capacity).
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Backing store failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// I/O operation failed (file read/write/rename).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The store did not answer within the per-operation deadline.
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The store refused a new entry because it is full.
    #[error("Queue capacity exceeded: {len}/{capacity} entries")]
    CapacityExceeded { len: usize, capacity: usize },

    /// Spool directory validation failed.
    #[error("Queue validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serialization and deserialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// Decoded entry does not match the file it was read from.
    #[error("Corrupted entry data: {0}")]
    Corrupted(String),
}

/// Spool directory validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Queue path must be absolute: {0}")]
    RelativePath(String),

    #[error("Queue path cannot contain '..': {0}")]
    ParentTraversal(String),

    #[error("Queue path points into a system directory: {0}")]
    SystemDirectory(String),

    #[error("Queue path is not a directory: {0}")]
    NotDirectory(String),
}

impl QueueError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl From<io::Error> for QueueError {
    fn from(e: io::Error) -> Self {
        Self::Persistence(e.into())
    }
}

impl From<SerializationError> for QueueError {
    fn from(e: SerializationError) -> Self {
        Self::Persistence(e.into())
    }
}

impl From<ValidationError> for QueueError {
    fn from(e: ValidationError) -> Self {
        Self::Persistence(e.into())
    }
}

// Convenience conversion for lock poisoning
impl<T> From<std::sync::PoisonError<T>> for QueueError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Persistence(PersistenceError::Internal(format!("Lock poisoned: {e}")))
    }
}

/// Specialized `Result` type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
