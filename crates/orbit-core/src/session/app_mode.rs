//! Overlay presentation mode.

use serde::{Deserialize, Serialize};

/// Which layout the overlay shows.
///
/// Switched by the reserved `/producer` and `/standard` commands; the
/// conversation itself is shared between both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    /// Compact floating prompt.
    #[default]
    Standard,
    /// Tall side panel with track context.
    Producer,
}

impl AppMode {
    /// Maps a reserved command to the mode it selects.
    ///
    /// The input is trimmed first, so `" /producer "` still switches.
    pub fn from_command(input: &str) -> Option<Self> {
        match input.trim() {
            "/producer" => Some(Self::Producer),
            "/standard" => Some(Self::Standard),
            _ => None,
        }
    }
}
