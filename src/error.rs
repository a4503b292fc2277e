//! Error types for playlist-dl
//!
//! Two layers of failure exist in a batch run:
//! - Run-fatal errors ([`Error::InvalidUrl`], [`Error::Resolution`]) stop the run before any
//!   item is processed.
//! - Item-level errors ([`EngineError`]) are classified into a
//!   [`FailureReason`](crate::types::FailureReason) and recorded; the run continues.

use thiserror::Error;

/// Result type alias for playlist-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlist-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_workers")
        key: Option<String>,
    },

    /// Source URL is malformed or does not use http/https
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Resolving the batch URL into items failed
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Fetch-and-transcode engine failure for a single item
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// External tool execution failed (yt-dlp, ffmpeg)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Error raised by a [`FetchEngine`](crate::engine::FetchEngine) for one item.
///
/// The message is the engine's own error text; access-restriction detection works on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    /// Engine-provided error text
    pub message: String,
}

impl EngineError {
    /// Create an engine error from any message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Whether the message indicates an access or authentication restriction
    /// (age gate, sign-in wall, private or members-only content).
    pub fn is_access_restricted(&self) -> bool {
        let msg = self.message.to_lowercase();
        ACCESS_RESTRICTED_MARKERS
            .iter()
            .any(|marker| msg.contains(marker))
    }

    /// Whether the message looks like a transport-level failure
    pub fn is_network(&self) -> bool {
        let msg = self.message.to_lowercase();
        NETWORK_MARKERS.iter().any(|marker| msg.contains(marker))
    }
}

const ACCESS_RESTRICTED_MARKERS: &[&str] = &[
    "age-restricted",
    "age restricted",
    "confirm your age",
    "inappropriate for some users",
    "sign in",
    "login",
    "log in",
    "private video",
    "members-only",
    "members only",
];

const NETWORK_MARKERS: &[&str] = &[
    "timed out",
    "timeout",
    "connection",
    "network",
    "temporary failure",
    "http error 5",
    "http error 429",
    "unable to download",
    "getaddrinfo",
];
