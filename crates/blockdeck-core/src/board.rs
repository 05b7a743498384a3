//! Board aggregate: an ordered collection of blocks plus metadata.

use crate::blocks::{Block, BlockId};
use chrono::{DateTime, Utc};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A board: the unit of persistence and sharing.
///
/// `blocks` order is the z-order (last = topmost) and is authoritative.
/// Block ids are unique within a board; inserts of a duplicate id are
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_trashed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Board {
    /// Create a new empty board.
    pub fn new(user_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            description: String::new(),
            tags: BTreeSet::new(),
            is_public: false,
            is_archived: false,
            is_trashed: false,
            created_at: now,
            updated_at: now,
            blocks: Vec::new(),
        }
    }

    /// Refresh the updated-at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Get a block by id.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Get a mutable block by id.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Z-order index of a block (0 = bottommost).
    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.index_of(id).is_some()
    }

    /// Insert a block at a z index (clamped to the end).
    ///
    /// Returns false without inserting when the id already exists.
    pub fn insert_block(&mut self, index: usize, block: Block) -> bool {
        if self.contains(block.id) {
            return false;
        }
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
        true
    }

    /// Push a block on top of the stack.
    pub fn push_block(&mut self, block: Block) -> bool {
        self.insert_block(self.blocks.len(), block)
    }

    /// Remove a block by id, returning it with its former z index.
    pub fn remove_block(&mut self, id: BlockId) -> Option<(usize, Block)> {
        let index = self.index_of(id)?;
        Some((index, self.blocks.remove(index)))
    }

    /// Move a block to a new z index (clamped). Returns false when the
    /// block is missing.
    pub fn move_block(&mut self, id: BlockId, index: usize) -> bool {
        let Some((_, block)) = self.remove_block(id) else {
            return false;
        };
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
        true
    }

    /// Bring a block to the front (topmost).
    pub fn bring_to_front(&mut self, id: BlockId) -> bool {
        self.move_block(id, usize::MAX)
    }

    /// Send a block to the back (bottommost).
    pub fn send_to_back(&mut self, id: BlockId) -> bool {
        self.move_block(id, 0)
    }

    /// Move a block one layer forward. Returns false if missing or already
    /// at the front.
    pub fn bring_forward(&mut self, id: BlockId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos + 1 < self.blocks.len() => {
                self.blocks.swap(pos, pos + 1);
                true
            }
            _ => false,
        }
    }

    /// Move a block one layer backward. Returns false if missing or already
    /// at the back.
    pub fn send_backward(&mut self, id: BlockId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos > 0 => {
                self.blocks.swap(pos, pos - 1);
                true
            }
            _ => false,
        }
    }

    /// Blocks whose geometry contains a point, front to back.
    pub fn blocks_at_point(&self, point: Point, tolerance: f64) -> Vec<BlockId> {
        self.blocks
            .iter()
            .rev()
            .filter(|b| b.geometry.contains(point, tolerance))
            .map(|b| b.id)
            .collect()
    }

    /// The topmost block at a point, if any.
    pub fn top_block_at_point(&self, point: Point, tolerance: f64) -> Option<BlockId> {
        self.blocks
            .iter()
            .rev()
            .find(|b| b.geometry.contains(point, tolerance))
            .map(|b| b.id)
    }

    /// Serialize the board to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a board from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockKind;

    fn board_with(kinds: &[BlockKind]) -> (Board, Vec<BlockId>) {
        let mut board = Board::new(Uuid::new_v4(), "test");
        let mut ids = Vec::new();
        for (i, kind) in kinds.iter().enumerate() {
            let block = Block::new(*kind, Point::new(i as f64 * 10.0, 0.0));
            ids.push(block.id);
            assert!(board.push_block(block));
        }
        (board, ids)
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let (mut board, ids) = board_with(&[BlockKind::Note]);
        let dup = board.block(ids[0]).unwrap().clone();
        assert!(!board.push_block(dup));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_z_order_operations() {
        let (mut board, ids) = board_with(&[BlockKind::Note, BlockKind::Link, BlockKind::Image]);

        assert!(board.bring_to_front(ids[0]));
        assert_eq!(board.index_of(ids[0]), Some(2));

        assert!(board.send_to_back(ids[0]));
        assert_eq!(board.index_of(ids[0]), Some(0));

        assert!(board.bring_forward(ids[0]));
        assert_eq!(board.index_of(ids[0]), Some(1));

        assert!(board.send_backward(ids[0]));
        assert_eq!(board.index_of(ids[0]), Some(0));
        assert!(!board.send_backward(ids[0]));
    }

    #[test]
    fn test_remove_returns_former_index() {
        let (mut board, ids) = board_with(&[BlockKind::Note, BlockKind::Link]);
        let (index, block) = board.remove_block(ids[1]).unwrap();
        assert_eq!(index, 1);
        assert_eq!(block.id, ids[1]);
        assert!(board.remove_block(ids[1]).is_none());
    }

    #[test]
    fn test_blocks_at_point_front_to_back() {
        let mut board = Board::new(Uuid::new_v4(), "hits");
        let mut bottom = Block::new(BlockKind::Note, Point::new(0.0, 0.0));
        bottom.geometry.width = 100.0;
        bottom.geometry.height = 100.0;
        let mut top = Block::new(BlockKind::Note, Point::new(50.0, 50.0));
        top.geometry.width = 100.0;
        top.geometry.height = 100.0;
        let (bottom_id, top_id) = (bottom.id, top.id);
        board.push_block(bottom);
        board.push_block(top);

        let hits = board.blocks_at_point(Point::new(75.0, 75.0), 0.0);
        assert_eq!(hits, vec![top_id, bottom_id]);
        assert_eq!(board.top_block_at_point(Point::new(75.0, 75.0), 0.0), Some(top_id));
        assert_eq!(board.top_block_at_point(Point::new(25.0, 25.0), 0.0), Some(bottom_id));
        assert_eq!(board.top_block_at_point(Point::new(500.0, 500.0), 0.0), None);
    }

    #[test]
    fn test_json_round_trip() {
        let (mut board, _) = board_with(&[BlockKind::Note, BlockKind::HabitTracker]);
        board.tags.insert("mornings".to_string());
        board.is_public = true;

        let json = board.to_json().unwrap();
        let back = Board::from_json(&json).unwrap();
        assert_eq!(back, board);

        // Wire format is camelCase.
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["userId"].is_string());
        assert!(value["isPublic"].as_bool().unwrap());
        assert!(value["createdAt"].is_string());
    }
}
