//! Slash command domain models.

use serde::{Deserialize, Serialize};

/// A palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command name including the leading `/` (e.g. `/producer`)
    pub name: String,
    /// Human-readable description
    pub description: String,
}

impl Command {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Case-insensitive, unanchored match of `needle` against the name.
    ///
    /// `needle` must already be lowercased.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
    }
}
