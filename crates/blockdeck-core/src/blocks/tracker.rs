//! Payloads for the time-tracked block kinds and their completion history.
//!
//! Each tracked kind carries a sparse history map from a `YYYY-MM-DD` date
//! key to per-item completion records. The per-kind extraction rules live
//! in the progress module; the types here only define the data.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Completion record for one item on one date.
///
/// Habit and gratitude items record a single flag; affirmations record one
/// flag per repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayEntry {
    Done(bool),
    Reps(Vec<bool>),
}

impl DayEntry {
    /// Count of truthy completions in this entry.
    pub fn completed(&self) -> usize {
        match self {
            DayEntry::Done(done) => usize::from(*done),
            DayEntry::Reps(reps) => reps.iter().filter(|r| **r).count(),
        }
    }
}

/// Sparse per-date completion history: date key -> item id -> record.
///
/// A missing date or item always means "not completed".
pub type HistoryMap = BTreeMap<String, HashMap<String, DayEntry>>;

/// A single habit being tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
}

/// Daily habit tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitTrackerPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub history: HistoryMap,
}

/// A single gratitude prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GratitudeItem {
    pub id: String,
    pub text: String,
}

/// Daily gratitude journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GratitudePayload {
    #[serde(default)]
    pub items: Vec<GratitudeItem>,
    #[serde(default)]
    pub history: HistoryMap,
}

/// A single affirmation with a daily repeat target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affirmation {
    pub id: String,
    pub text: String,
    /// How many repetitions count as a complete day.
    pub target_count: u32,
}

/// Daily affirmations with per-repetition tracking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffirmationsPayload {
    #[serde(default)]
    pub affirmations: Vec<Affirmation>,
    #[serde(default)]
    pub history: HistoryMap,
}
