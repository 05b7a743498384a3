//! Invertible commands and the per-session undo/redo history.
//!
//! Every command carries full before/after block snapshots (with z index),
//! never chained diffs, so evicting old history entries is always safe and
//! undo is a pure swap of the two sides.

use crate::blocks::{Block, BlockId, PatchError};
use crate::board::Board;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of commands kept on the undo stack.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Errors surfaced while applying commands.
///
/// Conflicts are recoverable: the offending command is dropped and the
/// board is left unchanged.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The target block is no longer on the board (e.g. removed by a
    /// concurrent session).
    #[error("block {0} no longer exists on the board")]
    Conflict(BlockId),
    /// An add targets an id that is already present.
    #[error("block {0} already exists on the board")]
    DuplicateId(BlockId),
    /// Another block holds an exclusive interaction state.
    #[error("another interaction is in progress")]
    Busy,
    #[error(transparent)]
    InvalidPatch(#[from] PatchError),
}

/// One block's before/after pair inside a command.
///
/// `None` on one side encodes add (no before) or delete (no after); both
/// sides present encode update or reorder. Each side carries the block's z
/// index alongside the full snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub block_id: BlockId,
    pub before: Option<(usize, Block)>,
    pub after: Option<(usize, Block)>,
}

impl CommandEntry {
    pub fn add(index: usize, block: Block) -> Self {
        Self {
            block_id: block.id,
            before: None,
            after: Some((index, block)),
        }
    }

    pub fn delete(index: usize, block: Block) -> Self {
        Self {
            block_id: block.id,
            before: Some((index, block)),
            after: None,
        }
    }

    pub fn update(index: usize, before: Block, after: Block) -> Self {
        debug_assert_eq!(before.id, after.id);
        Self {
            block_id: before.id,
            before: Some((index, before)),
            after: Some((index, after)),
        }
    }

    pub fn reorder(from: usize, to: usize, block: Block) -> Self {
        Self {
            block_id: block.id,
            before: Some((from, block.clone())),
            after: Some((to, block)),
        }
    }

    fn inverted(&self) -> Self {
        Self {
            block_id: self.block_id,
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}

/// A recorded, invertible mutation applied to a board.
///
/// Composite actions (e.g. pasting several blocks) carry multiple entries
/// and are treated as one atomic unit by undo/redo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub label: String,
    pub entries: Vec<CommandEntry>,
}

impl Command {
    pub fn new(label: impl Into<String>, entries: Vec<CommandEntry>) -> Self {
        Self {
            label: label.into(),
            entries,
        }
    }

    pub fn single(label: impl Into<String>, entry: CommandEntry) -> Self {
        Self::new(label, vec![entry])
    }

    /// The inverse command (after and before swapped, entry order reversed).
    pub fn inverted(&self) -> Self {
        Self {
            label: self.label.clone(),
            entries: self.entries.iter().rev().map(CommandEntry::inverted).collect(),
        }
    }

    /// Check every entry against the live board without mutating it.
    fn validate(&self, board: &Board) -> Result<(), CommandError> {
        for entry in &self.entries {
            match (&entry.before, &entry.after) {
                (None, Some(_)) => {
                    if board.contains(entry.block_id) {
                        return Err(CommandError::DuplicateId(entry.block_id));
                    }
                }
                _ => {
                    if !board.contains(entry.block_id) {
                        return Err(CommandError::Conflict(entry.block_id));
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply all entries to the board. Validation is all-or-nothing: a
    /// conflicting entry leaves the board untouched.
    fn apply_to(&self, board: &mut Board) -> Result<(), CommandError> {
        self.validate(board)?;
        for entry in &self.entries {
            match (&entry.before, &entry.after) {
                (None, Some((index, block))) => {
                    board.insert_block(*index, block.clone());
                }
                (Some(_), None) => {
                    board.remove_block(entry.block_id);
                }
                (Some(_), Some((index, block))) => {
                    board.remove_block(entry.block_id);
                    board.insert_block(*index, block.clone());
                }
                (None, None) => {}
            }
        }
        board.touch();
        Ok(())
    }
}

/// Linear undo/redo history for one board session.
///
/// Passed around explicitly rather than living in global state, so the
/// engine stays instantiable and testable in isolation.
#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Command>,
    redo: Vec<Command>,
    depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_depth(depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            depth,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Apply a command and record it. New actions clear the redo stack
    /// (linear history, no branching redo).
    pub fn apply(&mut self, board: &mut Board, command: Command) -> Result<(), CommandError> {
        command.apply_to(board)?;
        self.undo.push(command);
        self.redo.clear();
        if self.undo.len() > self.depth {
            self.undo.remove(0);
        }
        Ok(())
    }

    /// Undo the most recent command.
    ///
    /// Returns `Ok(false)` on an empty stack. A conflicting command (its
    /// target vanished from the board) is dropped and surfaced as an error;
    /// the board is left unchanged.
    pub fn undo(&mut self, board: &mut Board) -> Result<bool, CommandError> {
        let Some(command) = self.undo.pop() else {
            return Ok(false);
        };
        match command.inverted().apply_to(board) {
            Ok(()) => {
                self.redo.push(command);
                Ok(true)
            }
            Err(err) => {
                warn!("undo of '{}' dropped: {err}", command.label);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone command. Mirrors [`History::undo`].
    pub fn redo(&mut self, board: &mut Board) -> Result<bool, CommandError> {
        let Some(command) = self.redo.pop() else {
            return Ok(false);
        };
        match command.apply_to(board) {
            Ok(()) => {
                self.undo.push(command);
                Ok(true)
            }
            Err(err) => {
                warn!("redo of '{}' dropped: {err}", command.label);
                Err(err)
            }
        }
    }
}
