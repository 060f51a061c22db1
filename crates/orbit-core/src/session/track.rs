//! Track context supplied by the track selector.
//!
//! Track data comes from outside the core as loosely shaped JSON. It is
//! normalized into [`Track`] here, at the boundary, and then only serialized
//! into the outgoing message.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Header line of the text encoding.
pub const TRACK_CONTEXT_HEADER: &str = "Context - Selected tracks:";

/// One selected track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTrack")]
pub struct Track {
    pub index: i64,
    pub name: String,
    pub mute: bool,
    pub solo: bool,
    pub arm: bool,
}

/// Wire shape with every field optional; unknown fields (`color`,
/// `is_foldable`, ...) are ignored.
#[derive(Deserialize)]
struct RawTrack {
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mute: Option<bool>,
    #[serde(default)]
    solo: Option<bool>,
    #[serde(default)]
    arm: Option<bool>,
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        let index = raw.index.unwrap_or(0);
        let name = raw
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Track {index}"));
        Self {
            index,
            name,
            mute: raw.mute.unwrap_or(false),
            solo: raw.solo.unwrap_or(false),
            arm: raw.arm.unwrap_or(false),
        }
    }
}

impl Track {
    /// Creates a track with all flags cleared.
    pub fn new(index: i64, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            mute: false,
            solo: false,
            arm: false,
        }
    }

    pub fn with_flags(mut self, mute: bool, solo: bool, arm: bool) -> Self {
        self.mute = mute;
        self.solo = solo;
        self.arm = arm;
        self
    }

    /// `Track {index}: {name} (mute: {mute}, solo: {solo}, arm: {arm})`
    pub fn context_line(&self) -> String {
        format!(
            "Track {}: {} (mute: {}, solo: {}, arm: {})",
            self.index, self.name, self.mute, self.solo, self.arm
        )
    }

    /// Parses a JSON array of tracks.
    pub fn try_parse_selection(json: &str) -> Result<Vec<Track>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a JSON array of tracks, treating malformed input as "no context".
    pub fn parse_selection(json: &str) -> Vec<Track> {
        match Self::try_parse_selection(json) {
            Ok(tracks) => tracks,
            Err(e) => {
                tracing::warn!("[Track] Ignoring malformed track context: {}", e);
                Vec::new()
            }
        }
    }

    /// Serializes tracks as the JSON array carried in `selected_tracks`.
    pub fn selection_to_json(tracks: &[Track]) -> Result<String> {
        Ok(serde_json::to_string(tracks)?)
    }
}

/// How track context travels to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackEncoding {
    /// Prefix block inside the message text.
    #[default]
    Text,
    /// Raw query plus a JSON array in a separate `selected_tracks` field.
    Json,
}

/// Renders the message sent to the backend for `query` and `tracks`.
///
/// With no tracks the query is returned unchanged.
pub fn render_track_context(query: &str, tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return query.to_string();
    }

    let lines = tracks
        .iter()
        .map(Track::context_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{TRACK_CONTEXT_HEADER}\n{lines}\n\nQuery: {query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_single_track_block() {
        let tracks = vec![Track::new(0, "Drums").with_flags(false, true, false)];
        assert_eq!(
            render_track_context("Analyze", &tracks),
            "Context - Selected tracks:\nTrack 0: Drums (mute: false, solo: true, arm: false)\n\nQuery: Analyze"
        );
    }

    #[test]
    fn renders_tracks_in_input_order() {
        let tracks = vec![
            Track::new(0, "Drums").with_flags(false, true, false),
            Track::new(1, "Bass").with_flags(true, false, true),
        ];
        let expected = "Context - Selected tracks:
Track 0: Drums (mute: false, solo: true, arm: false)
Track 1: Bass (mute: true, solo: false, arm: true)

Query: Analyze these tracks";
        assert_eq!(render_track_context("Analyze these tracks", &tracks), expected);
    }

    #[test]
    fn no_tracks_sends_raw_query() {
        assert_eq!(render_track_context("  hello ", &[]), "  hello ");
    }

    #[test]
    fn missing_fields_are_defaulted() {
        let tracks = Track::parse_selection(r#"[{"index": 3}, {"name": "Keys", "solo": true}]"#);
        assert_eq!(tracks[0], Track::new(3, "Track 3"));
        assert_eq!(tracks[1], Track::new(0, "Keys").with_flags(false, true, false));
    }

    #[test]
    fn selector_extras_are_ignored() {
        let json = r#"[{"index": 1, "name": "Bass", "color": 1234, "is_foldable": false, "mute": true, "solo": false, "arm": true}]"#;
        let tracks = Track::parse_selection(json);
        assert_eq!(tracks, vec![Track::new(1, "Bass").with_flags(true, false, true)]);
    }

    #[test]
    fn malformed_context_degrades_to_empty() {
        assert!(Track::parse_selection("not json").is_empty());
        assert!(Track::parse_selection(r#"{"index": 0}"#).is_empty());
        assert!(Track::try_parse_selection("[").is_err());
    }

    #[test]
    fn json_encoding_carries_all_fields() {
        let tracks = vec![Track::new(2, "Vox").with_flags(true, true, false)];
        let json = Track::selection_to_json(&tracks).unwrap();
        assert_eq!(
            json,
            r#"[{"index":2,"name":"Vox","mute":true,"solo":true,"arm":false}]"#
        );
        assert_eq!(Track::parse_selection(&json), tracks);
    }
}
