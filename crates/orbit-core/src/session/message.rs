//! Conversation message types.
//!
//! This module contains types for representing messages in a conversation,
//! including speakers and message content.

use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// Message typed by the user.
    User,
    /// Message produced by the assistant backend.
    Ai,
}

/// A single message in the conversation history.
///
/// Messages are values: an in-progress AI answer grows by replacing the
/// whole message, never by mutating a shared string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The speaker of the message.
    pub speaker: Speaker,
    /// The content of the message.
    pub text: String,
}

impl Message {
    /// Creates a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    /// Creates an AI message.
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            text: text.into(),
        }
    }

    /// Returns a new message from the same speaker with `text`.
    pub fn with_text(&self, text: String) -> Self {
        Self {
            speaker: self.speaker,
            text,
        }
    }
}
