//! Error types for the Orbit client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole Orbit client.
///
/// Every variant carries plain strings so the error can cross thread and
/// serialization boundaries (it is rendered into chat messages verbatim).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitError {
    /// IO error (file system, child process pipes)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend rejected or failed an invocation
    #[error("Backend error: {0}")]
    Backend(String),

    /// Event channel subscription failed
    #[error("Channel error: {0}")]
    Channel(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrbitError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a Channel error
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Check if this is a backend error
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Human-readable details without the variant prefix.
    ///
    /// Used when the error is surfaced inline as `Error: {details}` so the
    /// chat line reads like the backend's own message.
    pub fn details(&self) -> String {
        match self {
            Self::Io { message } => message.clone(),
            Self::Serialization { format, message } => format!("{format}: {message}"),
            Self::Config(message)
            | Self::Backend(message)
            | Self::Channel(message)
            | Self::Internal(message) => message.clone(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for OrbitError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for OrbitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for OrbitError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for OrbitError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at the binary boundary)
impl From<anyhow::Error> for OrbitError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Conversion from String (for error messages)
impl From<String> for OrbitError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, OrbitError>`.
pub type Result<T> = std::result::Result<T, OrbitError>;
