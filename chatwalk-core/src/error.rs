//! Error types for the chatwalk core engine.

use thiserror::Error;

/// Top-level error type for core engine operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No live simulation instance exists for the given chatter id.
    #[error("Chatter not found: {0}")]
    ChatterNotFound(crate::ChatterId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CoreError>;
