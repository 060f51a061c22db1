//! Session domain module.
//!
//! This module contains the conversation data model that the streaming
//! session manager operates on.
//!
//! # Module Structure
//!
//! - `message`: Conversation message types (`Speaker`, `Message`)
//! - `history`: Append-biased conversation log (`History`, `ReplaceMode`)
//! - `track`: Track context normalization and serialization (`Track`)
//! - `app_mode`: Overlay layout mode (`AppMode`)
//!
//! # Usage
//!
//! ```ignore
//! use orbit_core::session::{History, Message, ReplaceMode};
//! use orbit_core::session::{Track, render_track_context};
//! ```

mod app_mode;
mod history;
mod message;
mod track;

// Re-export public API
pub use app_mode::AppMode;
pub use history::{History, ReplaceMode};
pub use message::{Message, Speaker};
pub use track::{render_track_context, Track, TrackEncoding, TRACK_CONTEXT_HEADER};
