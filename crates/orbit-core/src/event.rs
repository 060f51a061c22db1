//! Backend event channels.
//!
//! The backend reports streaming progress on three named channels. The
//! client registers listeners on them through [`EventChannels`]; the concrete
//! transport (in-process bus, IPC bridge) lives in the infrastructure layer.
//!
//! Every delivery is tagged with the [`SubmissionId`] of the request that
//! produced it, so a listener can tell a stale stream from its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Incremental answer fragments (string payload, fires many times).
pub const STREAM_CHUNK: &str = "stream_chunk";
/// End of a successful stream (no payload, fires once).
pub const STREAM_DONE: &str = "stream_done";
/// End of a failed stream (string payload, fires once).
pub const STREAM_ERROR: &str = "stream_error";

/// Payload carried by a channel event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Empty,
    Text(String),
}

impl EventPayload {
    /// Text content, or `""` for an empty payload.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Text(text) => text,
        }
    }
}

/// Identifies one submitted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "submission-{}", self.0)
    }
}

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Callback invoked for every event on a channel, in emit order, with the
/// submission the event belongs to.
pub type EventHandler = Arc<dyn Fn(SubmissionId, EventPayload) + Send + Sync>;

/// Named event channels the backend publishes on.
pub trait EventChannels: Send + Sync {
    /// Registers `handler` on `channel`.
    fn listen(&self, channel: &str, handler: EventHandler) -> Result<ListenerId>;

    /// Removes a listener. Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);
}

/// Typed view of the three stream channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(String),
    Done,
    Error(String),
}

impl StreamEvent {
    /// Channel this event is published on.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Chunk(_) => STREAM_CHUNK,
            Self::Done => STREAM_DONE,
            Self::Error(_) => STREAM_ERROR,
        }
    }

    pub fn payload(&self) -> EventPayload {
        match self {
            Self::Chunk(text) | Self::Error(text) => EventPayload::Text(text.clone()),
            Self::Done => EventPayload::Empty,
        }
    }

    /// Rebuilds the typed event from a raw channel delivery.
    pub fn from_channel(channel: &str, payload: EventPayload) -> Option<Self> {
        match channel {
            STREAM_CHUNK => Some(Self::Chunk(payload.as_text().to_string())),
            STREAM_DONE => Some(Self::Done),
            STREAM_ERROR => Some(Self::Error(payload.as_text().to_string())),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}
