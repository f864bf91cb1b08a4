//! Backing store implementations for the queue
//!
//! - `memory`: In-memory storage for tests and development
//! - `file`: One bincode file per entry, for production use
//!
//! Both keep their entries in a shared in-memory index ordered by timestamp.

pub mod file;
mod index;
pub mod memory;

pub use file::FileQueueStore;
pub use memory::MemoryQueueStore;
