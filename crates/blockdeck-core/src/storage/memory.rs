//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::board::Board;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// In-memory storage for testing and ephemeral use.
///
/// Boards are keyed by their own id; saving a board replaces any prior
/// snapshot under that id.
#[derive(Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<Uuid, Board>>,
}

fn poisoned<T>(err: PoisonError<T>) -> StorageError {
    StorageError::Other(format!("storage lock poisoned: {err}"))
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored boards.
    pub fn len(&self) -> usize {
        self.boards.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn save(&self, board: &Board) -> BoxFuture<'_, StorageResult<()>> {
        let board = board.clone();
        Box::pin(async move {
            self.boards
                .write()
                .map_err(poisoned)?
                .insert(board.id, board);
            Ok(())
        })
    }

    fn load(&self, id: Uuid) -> BoxFuture<'_, StorageResult<Board>> {
        Box::pin(async move {
            self.boards
                .read()
                .map_err(poisoned)?
                .get(&id)
                .cloned()
                .ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            self.boards.write().map_err(poisoned)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>> {
        Box::pin(async move {
            Ok(self.boards.read().map_err(poisoned)?.keys().copied().collect())
        })
    }

    fn exists(&self, id: Uuid) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move {
            Ok(self.boards.read().map_err(poisoned)?.contains_key(&id))
        })
    }
}
