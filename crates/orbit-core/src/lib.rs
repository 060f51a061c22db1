//! Domain layer of the Orbit client.
//!
//! Pure data and state machines: the conversation history, track context,
//! the command palette, and the traits through which the application layer
//! reaches the backend and its event channels.

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod session;
pub mod slash_command;

// Re-export common error type
pub use error::{OrbitError, Result};
