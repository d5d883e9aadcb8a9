//! Emote catalog error types.

use thiserror::Error;

/// Errors that can occur while fetching or using the emote catalog.
#[derive(Debug, Error)]
pub enum EmoteError {
    /// HTTP request to the catalog endpoint failed.
    #[error("Catalog request failed: {0}")]
    RequestFailed(String),

    /// Catalog response was not in the expected shape.
    #[error("Failed to parse catalog response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("Catalog request timed out")]
    Timeout,

    /// No catalog source is configured.
    #[error("Emote catalog unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for EmoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EmoteError::Timeout
        } else if err.is_connect() {
            EmoteError::Unavailable(err.to_string())
        } else {
            EmoteError::RequestFailed(err.to_string())
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, EmoteError>;
