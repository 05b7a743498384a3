//! Persistence boundary for boards.
//!
//! The engine never talks to a backend directly: it marks the scheduler
//! dirty after each committed command and the host loop drives the actual
//! saves. Committed in-memory state is never rolled back by a persistence
//! failure.

mod memory;
mod scheduler;

pub use memory::MemoryStorage;
pub use scheduler::{
    SaveScheduler, SyncStatus, DEFAULT_DEBOUNCE_MS, MAX_SAVE_ATTEMPTS,
};

use crate::board::Board;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("board not found: {0}")]
    NotFound(Uuid),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for board storage backends, keyed by board id.
///
/// Implementations can store boards in memory, on disk, or behind a
/// remote backend-as-a-service. Concurrent sessions are not reconciled
/// here: last save wins.
pub trait Storage: Send + Sync {
    /// Save a board snapshot under its own id.
    fn save(&self, board: &Board) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a board snapshot.
    fn load(&self, id: Uuid) -> BoxFuture<'_, StorageResult<Board>>;

    /// Delete a board.
    fn delete(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>>;

    /// List all stored board ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>>;

    /// Check if a board exists.
    fn exists(&self, id: Uuid) -> BoxFuture<'_, StorageResult<bool>>;
}
