//! Error types for watch-on-lbry

use thiserror::Error;

/// Coarse classification of failures, used to decide how a cycle reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Resolution errors
    PathNotFound,
    TransportError,

    // Load-time errors
    ConfigurationError,

    // Messaging errors
    InvalidMessage,

    // System errors
    FileError,
    ParseError,
}

/// Main error type for watch-on-lbry
#[derive(Error, Debug)]
pub enum WatchOnLbryError {
    #[error("Response path not found: {0}")]
    PathNotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Background error: {0}")]
    Background(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WatchOnLbryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PathNotFound(_) => ErrorCode::PathNotFound,
            Self::Transport(_) => ErrorCode::TransportError,
            Self::Configuration(_) => ErrorCode::ConfigurationError,
            Self::Network(_) => ErrorCode::TransportError,
            Self::Background(_) => ErrorCode::TransportError,
            Self::InvalidMessage(_) => ErrorCode::InvalidMessage,
            Self::File(_) => ErrorCode::FileError,
            Self::Http(_) => ErrorCode::TransportError,
            Self::Json(_) => ErrorCode::ParseError,
        }
    }

    /// Whether the failure means "unknown" rather than "confirmed absent"
    pub fn is_transport(&self) -> bool {
        self.code() == ErrorCode::TransportError
    }
}

pub type Result<T> = std::result::Result<T, WatchOnLbryError>;
