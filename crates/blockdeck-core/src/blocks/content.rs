//! Payloads for the content block kinds.

use serde::{Deserialize, Serialize};

/// Free-form text note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    #[serde(default)]
    pub text: String,
    /// Card accent color as a hex string (e.g. "#ffd166").
    #[serde(default)]
    pub color: Option<String>,
}

/// One entry of a checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

/// A simple to-do style checklist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

/// A picture placed on the board. The file itself lives with the upload
/// collaborator; the block only carries the reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// An external link card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPayload {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}
