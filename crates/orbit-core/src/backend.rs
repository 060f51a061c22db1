//! Backend invocation surface.
//!
//! The backend is addressed by symbolic command names. `ask_orbit` is a
//! request/response call; `process_query_stream` returns nothing directly and
//! reports progress on the event channels in [`crate::event`], tagged with
//! the request's [`SubmissionId`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::SubmissionId;
use crate::session::{render_track_context, Track, TrackEncoding};

/// Single-shot command name.
pub const ASK_COMMAND: &str = "ask_orbit";
/// Streaming command name.
pub const STREAM_COMMAND: &str = "process_query_stream";

/// Payload of [`ASK_COMMAND`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub message: String,
}

/// Payload of [`STREAM_COMMAND`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub query: String,
    /// JSON array of tracks, present only with [`TrackEncoding::Json`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tracks: Option<String>,
    /// Tag the backend must put on every event it emits for this request.
    #[serde(default)]
    pub submission: SubmissionId,
}

impl StreamRequest {
    /// Request without track context.
    pub fn new(query: impl Into<String>, submission: SubmissionId) -> Self {
        Self {
            query: query.into(),
            selected_tracks: None,
            submission,
        }
    }

    /// Builds the outgoing request for `query` with optional track context.
    pub fn compose(
        submission: SubmissionId,
        query: &str,
        tracks: &[Track],
        encoding: TrackEncoding,
    ) -> Self {
        match encoding {
            TrackEncoding::Text => Self::new(render_track_context(query, tracks), submission),
            TrackEncoding::Json if tracks.is_empty() => Self::new(query, submission),
            TrackEncoding::Json => {
                let selected_tracks = match Track::selection_to_json(tracks) {
                    Ok(json) => Some(json),
                    Err(e) => {
                        tracing::warn!("[StreamRequest] Dropping track context: {}", e);
                        None
                    }
                };
                Self {
                    selected_tracks,
                    ..Self::new(query, submission)
                }
            }
        }
    }

    /// The text a single-shot backend receives for this request.
    ///
    /// JSON-encoded context is folded back into the text block, since
    /// `ask_orbit` only carries one string.
    pub fn message(&self) -> String {
        match &self.selected_tracks {
            None => self.query.clone(),
            Some(json) => render_track_context(&self.query, &Track::parse_selection(json)),
        }
    }
}

/// The native backend process.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `ask_orbit`: returns the whole answer.
    async fn ask(&self, message: &str) -> Result<String>;

    /// `process_query_stream`: answer arrives on the event channels, every
    /// event tagged with `request.submission`.
    ///
    /// An `Err` means the invocation itself was rejected.
    async fn stream(&self, request: StreamRequest) -> Result<()>;
}
