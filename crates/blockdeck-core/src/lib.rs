//! BlockDeck Core Library
//!
//! Platform-agnostic document engine for block boards: the block model,
//! board aggregate, invertible command history, interaction session, and
//! the persistence boundary. Rendering and input decoding live in the
//! host; everything here is plain data and deterministic logic.

pub mod blocks;
pub mod board;
pub mod command;
pub mod geometry;
pub mod interaction;
pub mod progress;
pub mod storage;

pub use blocks::{Block, BlockId, BlockKind, BlockPayload, KindSpec, PatchError};
pub use board::Board;
pub use command::{Command, CommandEntry, CommandError, History, DEFAULT_HISTORY_DEPTH};
pub use geometry::{Corner, Geometry, MinSize};
pub use interaction::{InteractionState, Session};
pub use progress::{completion_percent, day_qualifies, streak};
pub use storage::{MemoryStorage, SaveScheduler, Storage, StorageError, SyncStatus};
