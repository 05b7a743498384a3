//! Block definitions for the board.

mod content;
mod tracker;

pub use content::{ChecklistItem, ChecklistPayload, ImagePayload, LinkPayload, NotePayload};
pub use tracker::{
    Affirmation, AffirmationsPayload, DayEntry, GratitudePayload, GratitudeItem, Habit,
    HabitTrackerPayload, HistoryMap,
};

use crate::geometry::{Geometry, MinSize};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for blocks.
pub type BlockId = Uuid;

/// The closed set of block kinds.
///
/// New kinds are added here and in the registry table below; everything
/// else (geometry, commands, selection) is kind-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Note,
    Checklist,
    Image,
    Link,
    HabitTracker,
    Gratitude,
    Affirmations,
}

/// Per-kind defaults and size constraints.
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub min_width: f64,
    pub min_height: f64,
    pub default_width: f64,
    pub default_height: f64,
}

impl KindSpec {
    pub fn min_size(&self) -> MinSize {
        MinSize::new(self.min_width, self.min_height)
    }
}

impl BlockKind {
    /// Registry entry for this kind.
    ///
    /// The match is total over the closed enum, so an unregistered kind is
    /// unrepresentable.
    pub fn spec(&self) -> KindSpec {
        match self {
            BlockKind::Note => KindSpec {
                min_width: 120.0,
                min_height: 80.0,
                default_width: 220.0,
                default_height: 160.0,
            },
            BlockKind::Checklist => KindSpec {
                min_width: 160.0,
                min_height: 120.0,
                default_width: 240.0,
                default_height: 220.0,
            },
            BlockKind::Image => KindSpec {
                min_width: 100.0,
                min_height: 100.0,
                default_width: 280.0,
                default_height: 210.0,
            },
            BlockKind::Link => KindSpec {
                min_width: 140.0,
                min_height: 60.0,
                default_width: 260.0,
                default_height: 90.0,
            },
            BlockKind::HabitTracker => KindSpec {
                min_width: 200.0,
                min_height: 160.0,
                default_width: 320.0,
                default_height: 260.0,
            },
            BlockKind::Gratitude => KindSpec {
                min_width: 180.0,
                min_height: 140.0,
                default_width: 300.0,
                default_height: 240.0,
            },
            BlockKind::Affirmations => KindSpec {
                min_width: 180.0,
                min_height: 140.0,
                default_width: 300.0,
                default_height: 240.0,
            },
        }
    }

    /// Default payload for a freshly created block of this kind.
    pub fn default_payload(&self) -> BlockPayload {
        match self {
            BlockKind::Note => BlockPayload::Note(NotePayload::default()),
            BlockKind::Checklist => BlockPayload::Checklist(ChecklistPayload::default()),
            BlockKind::Image => BlockPayload::Image(ImagePayload::default()),
            BlockKind::Link => BlockPayload::Link(LinkPayload::default()),
            BlockKind::HabitTracker => {
                BlockPayload::HabitTracker(HabitTrackerPayload::default())
            }
            BlockKind::Gratitude => BlockPayload::Gratitude(GratitudePayload::default()),
            BlockKind::Affirmations => {
                BlockPayload::Affirmations(AffirmationsPayload::default())
            }
        }
    }
}

/// Kind-specific payload, tagged by `type` in the persisted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockPayload {
    Note(NotePayload),
    Checklist(ChecklistPayload),
    Image(ImagePayload),
    Link(LinkPayload),
    HabitTracker(HabitTrackerPayload),
    Gratitude(GratitudePayload),
    Affirmations(AffirmationsPayload),
}

impl BlockPayload {
    /// The kind discriminant for this payload.
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockPayload::Note(_) => BlockKind::Note,
            BlockPayload::Checklist(_) => BlockKind::Checklist,
            BlockPayload::Image(_) => BlockKind::Image,
            BlockPayload::Link(_) => BlockKind::Link,
            BlockPayload::HabitTracker(_) => BlockKind::HabitTracker,
            BlockPayload::Gratitude(_) => BlockKind::Gratitude,
            BlockPayload::Affirmations(_) => BlockKind::Affirmations,
        }
    }
}

/// Errors raised by partial payload merges.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch must be a JSON object")]
    NotAnObject,
    #[error("patch may not change the block kind")]
    KindChange,
    #[error("patch produced an invalid payload: {0}")]
    InvalidPayload(String),
}

/// A positioned, kind-tagged content unit on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(flatten)]
    pub payload: BlockPayload,
}

impl Block {
    /// Create a new block of a kind at a position, with defaults merged and
    /// the geometry clamped to the kind's minimums.
    pub fn new(kind: BlockKind, position: Point) -> Self {
        let spec = kind.spec();
        let geometry = Geometry::new(position, spec.default_width, spec.default_height)
            .resized(spec.default_width, spec.default_height, spec.min_size());
        Self {
            id: Uuid::new_v4(),
            geometry,
            payload: kind.default_payload(),
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.payload.kind()
    }

    /// Minimum size for this block's kind.
    pub fn min_size(&self) -> MinSize {
        self.kind().spec().min_size()
    }

    /// Produce a new block with the partial payload shallow-merged in.
    ///
    /// Kind and id never change: a patch carrying a different `type` is
    /// rejected, and the merged object must deserialize back into the same
    /// payload variant.
    pub fn with_payload_patch(&self, patch: &serde_json::Value) -> Result<Block, PatchError> {
        let patch = patch.as_object().ok_or(PatchError::NotAnObject)?;

        let mut merged = match serde_json::to_value(&self.payload) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => return Err(PatchError::InvalidPayload("payload is not an object".into())),
        };
        for (key, value) in patch {
            if key == "type" {
                if merged.get("type") != Some(value) {
                    return Err(PatchError::KindChange);
                }
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }

        let payload: BlockPayload = serde_json::from_value(serde_json::Value::Object(merged))
            .map_err(|e| PatchError::InvalidPayload(e.to_string()))?;
        debug_assert_eq!(payload.kind(), self.kind());

        Ok(Block {
            id: self.id,
            geometry: self.geometry,
            payload,
        })
    }

    /// Regenerate the block's id. Used when pasting so copies stay unique
    /// within the board.
    pub fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
    }
}
