//! Error types for the ALEX gateway

use thiserror::Error;

/// Result type alias for gateway and session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the gateway or the session controller
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, unreadable config)
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed or missing request input
    #[error("invalid request: {0}")]
    Validation(String),

    /// Inference gateway or proxy failure, including non-conforming payloads
    #[error("service error: {0}")]
    Service(String),

    /// Capture device access was denied by the user or platform
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Operation not allowed in the current session state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the failure came from the caller's input rather than the service
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
