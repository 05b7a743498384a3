//! Selection and interaction state machine for one board session.
//!
//! A [`Session`] bundles the board, its command history and the current
//! interaction state, and is the single mutation surface exposed to editor
//! and UI collaborators. Drag and resize produce preview geometry on every
//! update but commit exactly one command at the end, no matter how many
//! preview frames occurred; cancelling restores the captured origin and
//! commits nothing.

use crate::blocks::{Block, BlockId, BlockKind, BlockPayload, PatchError};
use crate::board::Board;
use crate::command::{Command, CommandEntry, CommandError, History};
use crate::geometry::{Corner, Geometry};
use kurbo::{Point, Vec2};
use log::debug;

/// Interaction state of the session.
///
/// At most one block may hold `Dragging`, `Resizing` or `Editing` at a
/// time; attempts to enter one of these states while another block holds
/// one are rejected, not preempted. While a block is `Editing`, geometry
/// interaction for it is suspended and a kind-specific editor owns it
/// until it commits a full payload replace or cancels.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    Selected(BlockId),
    Dragging { id: BlockId, origin: Geometry },
    Resizing { id: BlockId, handle: Corner, origin: Geometry },
    Editing(BlockId),
}

impl InteractionState {
    /// States that exclusively own a block.
    fn is_exclusive(&self) -> bool {
        matches!(
            self,
            InteractionState::Dragging { .. }
                | InteractionState::Resizing { .. }
                | InteractionState::Editing(_)
        )
    }
}

/// One open editing session over a board.
pub struct Session {
    board: Board,
    history: History,
    state: InteractionState,
    revision: u64,
}

impl Session {
    /// Open a session over a board with a fresh history.
    pub fn new(board: Board) -> Self {
        Self {
            board,
            history: History::new(),
            state: InteractionState::Idle,
            revision: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Tear down the session, handing the board back for a final save.
    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// The currently selected block, if any.
    pub fn selected(&self) -> Option<BlockId> {
        match self.state {
            InteractionState::Idle => None,
            InteractionState::Selected(id)
            | InteractionState::Dragging { id, .. }
            | InteractionState::Resizing { id, .. }
            | InteractionState::Editing(id) => Some(id),
        }
    }

    /// Counter bumped on every committed command; the save scheduler
    /// watches it to know when the board changed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn commit(&mut self, command: Command) -> Result<(), CommandError> {
        debug!("commit '{}' ({} entries)", command.label, command.entries.len());
        self.history.apply(&mut self.board, command)?;
        self.revision += 1;
        Ok(())
    }

    // ── Selection ──

    /// Click on a block (`Some`) or empty canvas (`None`).
    ///
    /// Selecting replaces any prior selection (single-select). Rejected
    /// while a block holds an exclusive state.
    pub fn select(&mut self, id: Option<BlockId>) -> bool {
        if self.state.is_exclusive() {
            return false;
        }
        match id {
            Some(id) if self.board.contains(id) => {
                self.state = InteractionState::Selected(id);
                true
            }
            Some(_) => false,
            None => {
                self.state = InteractionState::Idle;
                true
            }
        }
    }

    /// Select whatever block is topmost under a point, or clear.
    pub fn select_at_point(&mut self, point: Point, tolerance: f64) -> Option<BlockId> {
        let hit = self.board.top_block_at_point(point, tolerance);
        if self.select(hit) { hit } else { None }
    }

    // ── Dragging ──

    /// Start dragging a block's body, capturing its origin geometry.
    pub fn begin_drag(&mut self, id: BlockId) -> bool {
        if self.state.is_exclusive() {
            return false;
        }
        let Some(block) = self.board.block(id) else {
            return false;
        };
        self.state = InteractionState::Dragging {
            id,
            origin: block.geometry,
        };
        true
    }

    /// Preview the drag at a cumulative delta from the start point.
    ///
    /// The board shows the preview geometry but nothing is committed.
    pub fn update_drag(&mut self, delta: Vec2) -> Option<Geometry> {
        let InteractionState::Dragging { id, origin } = self.state else {
            return None;
        };
        let preview = origin.translated(delta.x, delta.y);
        self.board.block_mut(id)?.geometry = preview;
        Some(preview)
    }

    /// Finish the drag, committing exactly one command for the whole
    /// gesture, even when no preview frame occurred.
    pub fn end_drag(&mut self) -> Result<bool, CommandError> {
        let InteractionState::Dragging { id, origin } = self.state else {
            return Ok(false);
        };
        self.state = InteractionState::Selected(id);
        self.finish_gesture(id, origin, "move block")
    }

    /// Abort the drag, restoring the origin geometry. No command.
    pub fn cancel_drag(&mut self) -> bool {
        let InteractionState::Dragging { id, origin } = self.state else {
            return false;
        };
        if let Some(block) = self.board.block_mut(id) {
            block.geometry = origin;
        }
        self.state = InteractionState::Selected(id);
        true
    }

    // ── Resizing ──

    /// Start resizing via a corner handle, capturing the origin geometry.
    pub fn begin_resize(&mut self, id: BlockId, handle: Corner) -> bool {
        if self.state.is_exclusive() {
            return false;
        }
        let Some(block) = self.board.block(id) else {
            return false;
        };
        self.state = InteractionState::Resizing {
            id,
            handle,
            origin: block.geometry,
        };
        true
    }

    /// Preview the resize at a cumulative delta, clamped to the kind's
    /// minimums in the block's unrotated local frame.
    pub fn update_resize(&mut self, delta: Vec2) -> Option<Geometry> {
        let InteractionState::Resizing { id, handle, origin } = self.state else {
            return None;
        };
        let min = self.board.block(id)?.min_size();
        let preview = origin.resize_by_handle(handle, delta, min);
        self.board.block_mut(id)?.geometry = preview;
        Some(preview)
    }

    /// Finish the resize, committing exactly one command.
    pub fn end_resize(&mut self) -> Result<bool, CommandError> {
        let InteractionState::Resizing { id, origin, .. } = self.state else {
            return Ok(false);
        };
        self.state = InteractionState::Selected(id);
        self.finish_gesture(id, origin, "resize block")
    }

    /// Abort the resize, restoring the origin geometry. No command.
    pub fn cancel_resize(&mut self) -> bool {
        let InteractionState::Resizing { id, origin, .. } = self.state else {
            return false;
        };
        if let Some(block) = self.board.block_mut(id) {
            block.geometry = origin;
        }
        self.state = InteractionState::Selected(id);
        true
    }

    /// Commit a drag/resize gesture as one update command, unconditionally:
    /// a gesture that ends on its origin still records one command. The
    /// board holds the preview geometry; it is rolled back to the origin
    /// first so the history's apply is the only mutation path.
    fn finish_gesture(
        &mut self,
        id: BlockId,
        origin: Geometry,
        label: &str,
    ) -> Result<bool, CommandError> {
        let Some(index) = self.board.index_of(id) else {
            self.state = InteractionState::Idle;
            return Err(CommandError::Conflict(id));
        };
        let after = self.board.blocks[index].clone();
        let mut before = after.clone();
        before.geometry = origin;
        self.board.blocks[index].geometry = origin;
        self.commit(Command::single(label, CommandEntry::update(index, before, after)))?;
        Ok(true)
    }

    // ── Rotation ──

    /// Rotate a block by a delta in degrees. Commits one command; a delta
    /// that normalizes to no change commits nothing.
    pub fn rotate(&mut self, id: BlockId, delta_deg: f64) -> Result<bool, CommandError> {
        if self.state.is_exclusive() {
            return Err(CommandError::Busy);
        }
        let index = self.board.index_of(id).ok_or(CommandError::Conflict(id))?;
        let before = self.board.blocks[index].clone();
        let mut after = before.clone();
        after.geometry = before.geometry.rotated(delta_deg);
        if after.geometry == before.geometry {
            return Ok(false);
        }
        self.commit(Command::single(
            "rotate block",
            CommandEntry::update(index, before, after),
        ))?;
        Ok(true)
    }

    // ── Editing ──

    /// Double-click: hand the block to its kind-specific editor.
    pub fn begin_editing(&mut self, id: BlockId) -> bool {
        if self.state.is_exclusive() {
            return false;
        }
        if !self.board.contains(id) {
            return false;
        }
        self.state = InteractionState::Editing(id);
        true
    }

    /// The editor commits a full payload replace for the edited block.
    /// The payload must keep the block's kind.
    pub fn commit_editing(&mut self, payload: BlockPayload) -> Result<bool, CommandError> {
        let InteractionState::Editing(id) = self.state else {
            return Ok(false);
        };
        let index = self.board.index_of(id).ok_or(CommandError::Conflict(id))?;
        let before = self.board.blocks[index].clone();
        if payload.kind() != before.kind() {
            return Err(PatchError::KindChange.into());
        }
        self.state = InteractionState::Selected(id);
        if payload == before.payload {
            return Ok(false);
        }
        let mut after = before.clone();
        after.payload = payload;
        self.commit(Command::single(
            "edit block",
            CommandEntry::update(index, before, after),
        ))?;
        Ok(true)
    }

    /// The editor cancels: no mutation, back to selected.
    pub fn cancel_editing(&mut self) -> bool {
        let InteractionState::Editing(id) = self.state else {
            return false;
        };
        self.state = InteractionState::Selected(id);
        true
    }

    // ── Structural commands ──

    /// Add a new block of a kind at a position (topmost). Returns its id.
    pub fn add_block(&mut self, kind: BlockKind, position: Point) -> Result<BlockId, CommandError> {
        if self.state.is_exclusive() {
            return Err(CommandError::Busy);
        }
        let block = Block::new(kind, position);
        let id = block.id;
        self.commit(Command::single(
            "add block",
            CommandEntry::add(self.board.len(), block),
        ))?;
        Ok(id)
    }

    /// Paste a batch of blocks as one atomic command. Ids are regenerated
    /// so copies stay unique within the board.
    pub fn paste_blocks(&mut self, mut blocks: Vec<Block>) -> Result<Vec<BlockId>, CommandError> {
        if self.state.is_exclusive() {
            return Err(CommandError::Busy);
        }
        if blocks.is_empty() {
            return Ok(Vec::new());
        }
        let base = self.board.len();
        let mut entries = Vec::with_capacity(blocks.len());
        let mut ids = Vec::with_capacity(blocks.len());
        for (offset, block) in blocks.iter_mut().enumerate() {
            block.regenerate_id();
            ids.push(block.id);
            entries.push(CommandEntry::add(base + offset, block.clone()));
        }
        self.commit(Command::new("paste blocks", entries))?;
        Ok(ids)
    }

    /// Delete a block. A missing id is a conflict and leaves the board
    /// unchanged.
    pub fn delete_block(&mut self, id: BlockId) -> Result<(), CommandError> {
        if self.state.is_exclusive() {
            return Err(CommandError::Busy);
        }
        let index = self.board.index_of(id).ok_or(CommandError::Conflict(id))?;
        let block = self.board.blocks[index].clone();
        self.commit(Command::single("delete block", CommandEntry::delete(index, block)))?;
        if self.state == InteractionState::Selected(id) {
            self.state = InteractionState::Idle;
        }
        Ok(())
    }

    /// Shallow-merge a partial payload into a block (kind and id fixed).
    pub fn update_block_payload(
        &mut self,
        id: BlockId,
        partial: &serde_json::Value,
    ) -> Result<(), CommandError> {
        if self.state.is_exclusive() {
            return Err(CommandError::Busy);
        }
        let index = self.board.index_of(id).ok_or(CommandError::Conflict(id))?;
        let before = self.board.blocks[index].clone();
        let after = before.with_payload_patch(partial)?;
        self.commit(Command::single(
            "update block",
            CommandEntry::update(index, before, after),
        ))
    }

    /// Move a block to an explicit z index.
    pub fn reorder_block(&mut self, id: BlockId, index: usize) -> Result<bool, CommandError> {
        if self.state.is_exclusive() {
            return Err(CommandError::Busy);
        }
        let from = self.board.index_of(id).ok_or(CommandError::Conflict(id))?;
        let to = index.min(self.board.len().saturating_sub(1));
        if from == to {
            return Ok(false);
        }
        let block = self.board.blocks[from].clone();
        self.commit(Command::single(
            "reorder block",
            CommandEntry::reorder(from, to, block),
        ))?;
        Ok(true)
    }

    // ── History ──

    pub fn undo(&mut self) -> Result<bool, CommandError> {
        if self.state.is_exclusive() {
            return Err(CommandError::Busy);
        }
        let undone = self.history.undo(&mut self.board)?;
        if undone {
            self.revision += 1;
            // Selection may point at a block the undo removed.
            if let InteractionState::Selected(id) = self.state {
                if !self.board.contains(id) {
                    self.state = InteractionState::Idle;
                }
            }
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, CommandError> {
        if self.state.is_exclusive() {
            return Err(CommandError::Busy);
        }
        let redone = self.history.redo(&mut self.board)?;
        if redone {
            self.revision += 1;
            if let InteractionState::Selected(id) = self.state {
                if !self.board.contains(id) {
                    self.state = InteractionState::Idle;
                }
            }
        }
        Ok(redone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session_with_note() -> (Session, BlockId) {
        let board = Board::new(Uuid::new_v4(), "interaction tests");
        let mut session = Session::new(board);
        let id = session.add_block(BlockKind::Note, Point::new(10.0, 10.0)).unwrap();
        (session, id)
    }

    #[test]
    fn test_click_selects_and_click_on_canvas_clears() {
        let (mut session, id) = session_with_note();
        assert!(session.select(Some(id)));
        assert_eq!(session.selected(), Some(id));

        let other = session.add_block(BlockKind::Link, Point::new(400.0, 0.0)).unwrap();
        assert!(session.select(Some(other)));
        assert_eq!(session.selected(), Some(other));

        assert!(session.select(None));
        assert_eq!(session.selected(), None);
        assert_eq!(*session.state(), InteractionState::Idle);
    }

    #[test]
    fn test_n_previews_commit_exactly_one_command() {
        for n in [0usize, 1, 7] {
            let (mut session, id) = session_with_note();
            session.select(Some(id));
            let revision = session.revision();

            assert!(session.begin_drag(id));
            for i in 0..n {
                let preview = session.update_drag(Vec2::new(i as f64 + 1.0, 0.0)).unwrap();
                assert!((preview.x - (10.0 + i as f64 + 1.0)).abs() < f64::EPSILON);
            }
            assert!(session.end_drag().unwrap());
            assert_eq!(session.revision(), revision + 1);
            assert_eq!(*session.state(), InteractionState::Selected(id));

            // Exactly one undo reverts the whole gesture.
            assert!(session.undo().unwrap());
            let g = session.board().block(id).unwrap().geometry;
            assert!((g.x - 10.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_zero_preview_drag_end_still_commits_one_command() {
        let (mut session, id) = session_with_note();
        let revision = session.revision();

        assert!(session.begin_drag(id));
        assert!(session.end_drag().unwrap());

        assert_eq!(session.revision(), revision + 1);
        // The recorded command is a faithful (if stationary) update.
        assert!(session.undo().unwrap());
        let g = session.board().block(id).unwrap().geometry;
        assert!((g.x - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_preview_resize_end_still_commits_one_command() {
        let (mut session, id) = session_with_note();
        let revision = session.revision();
        assert!(session.begin_resize(id, Corner::TopLeft));
        assert!(session.end_resize().unwrap());
        assert_eq!(session.revision(), revision + 1);
    }

    #[test]
    fn test_cancel_drag_restores_origin_without_command() {
        let (mut session, id) = session_with_note();
        let revision = session.revision();
        assert!(session.begin_drag(id));
        session.update_drag(Vec2::new(100.0, 100.0));
        assert!(session.cancel_drag());

        let g = session.board().block(id).unwrap().geometry;
        assert!((g.x - 10.0).abs() < f64::EPSILON);
        assert_eq!(session.revision(), revision);
    }

    #[test]
    fn test_resize_preview_clamps_and_commits_once() {
        let (mut session, id) = session_with_note();
        let min = session.board().block(id).unwrap().min_size();
        let revision = session.revision();

        assert!(session.begin_resize(id, Corner::BottomRight));
        let preview = session.update_resize(Vec2::new(-10_000.0, -10_000.0)).unwrap();
        assert!((preview.width - min.width).abs() < f64::EPSILON);
        assert!((preview.height - min.height).abs() < f64::EPSILON);
        assert!(session.end_resize().unwrap());
        assert_eq!(session.revision(), revision + 1);
    }

    #[test]
    fn test_exclusive_states_reject_second_holder() {
        let (mut session, id) = session_with_note();
        let other = session.add_block(BlockKind::Link, Point::new(300.0, 0.0)).unwrap();

        assert!(session.begin_drag(id));
        assert!(!session.begin_drag(other));
        assert!(!session.begin_resize(other, Corner::TopLeft));
        assert!(!session.begin_editing(other));
        assert!(!session.select(Some(other)));
        assert!(matches!(session.rotate(other, 15.0), Err(CommandError::Busy)));
        assert!(matches!(session.undo(), Err(CommandError::Busy)));
        session.cancel_drag();

        assert!(session.begin_editing(id));
        assert!(!session.begin_drag(id)); // geometry suspended while editing
        assert!(session.cancel_editing());
    }

    #[test]
    fn test_editing_commit_replaces_payload_and_is_undoable() {
        let (mut session, id) = session_with_note();
        assert!(session.begin_editing(id));

        let payload = BlockPayload::Note(crate::blocks::NotePayload {
            text: "rewritten".into(),
            color: None,
        });
        assert!(session.commit_editing(payload).unwrap());
        assert_eq!(*session.state(), InteractionState::Selected(id));
        match &session.board().block(id).unwrap().payload {
            BlockPayload::Note(n) => assert_eq!(n.text, "rewritten"),
            _ => panic!("expected note"),
        }

        assert!(session.undo().unwrap());
        match &session.board().block(id).unwrap().payload {
            BlockPayload::Note(n) => assert_eq!(n.text, ""),
            _ => panic!("expected note"),
        }
    }

    #[test]
    fn test_editing_commit_rejects_kind_change() {
        let (mut session, id) = session_with_note();
        assert!(session.begin_editing(id));
        let result = session.commit_editing(BlockPayload::Link(Default::default()));
        assert!(matches!(result, Err(CommandError::InvalidPatch(_))));
        // Still editing: the bad commit did not release the block.
        assert_eq!(*session.state(), InteractionState::Editing(id));
        assert_eq!(session.board().block(id).unwrap().kind(), BlockKind::Note);
    }

    #[test]
    fn test_cancel_editing_has_no_mutation() {
        let (mut session, id) = session_with_note();
        let revision = session.revision();
        assert!(session.begin_editing(id));
        assert!(session.cancel_editing());
        assert_eq!(session.revision(), revision);
        assert_eq!(*session.state(), InteractionState::Selected(id));
    }

    #[test]
    fn test_rotate_commits_and_normalizes() {
        let (mut session, id) = session_with_note();
        assert!(session.rotate(id, 405.0).unwrap());
        let g = session.board().block(id).unwrap().geometry;
        assert!((g.rotation - 45.0).abs() < 1e-9);

        // A full turn is not a change.
        assert!(!session.rotate(id, 360.0).unwrap());
    }

    #[test]
    fn test_delete_missing_block_is_conflict_and_board_unchanged() {
        let (mut session, _) = session_with_note();
        let len = session.board().len();
        let result = session.delete_block(Uuid::new_v4());
        assert!(matches!(result, Err(CommandError::Conflict(_))));
        assert_eq!(session.board().len(), len);
    }

    #[test]
    fn test_delete_clears_selection() {
        let (mut session, id) = session_with_note();
        session.select(Some(id));
        session.delete_block(id).unwrap();
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn test_paste_is_one_atomic_command() {
        let (mut session, _) = session_with_note();
        let blocks = vec![
            Block::new(BlockKind::Note, Point::ZERO),
            Block::new(BlockKind::Image, Point::new(50.0, 50.0)),
        ];
        let ids = session.paste_blocks(blocks).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(session.board().len(), 3);

        assert!(session.undo().unwrap());
        assert_eq!(session.board().len(), 1);
        for id in ids {
            assert!(!session.board().contains(id));
        }
    }

    #[test]
    fn test_update_block_payload_partial_merge() {
        let (mut session, id) = session_with_note();
        session
            .update_block_payload(id, &serde_json::json!({ "color": "#ffd166" }))
            .unwrap();
        match &session.board().block(id).unwrap().payload {
            BlockPayload::Note(n) => assert_eq!(n.color.as_deref(), Some("#ffd166")),
            _ => panic!("expected note"),
        }
    }

    #[test]
    fn test_reorder_block_round_trips_through_undo() {
        let (mut session, id) = session_with_note();
        let _top = session.add_block(BlockKind::Link, Point::new(200.0, 0.0)).unwrap();
        assert_eq!(session.board().index_of(id), Some(0));

        assert!(session.reorder_block(id, 1).unwrap());
        assert_eq!(session.board().index_of(id), Some(1));

        assert!(session.undo().unwrap());
        assert_eq!(session.board().index_of(id), Some(0));
        assert!(session.redo().unwrap());
        assert_eq!(session.board().index_of(id), Some(1));
    }
}
