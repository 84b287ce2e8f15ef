//! Error types for the submission store

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using a submission store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The submitted media ref is identical to the location's most recent
    /// submission.
    #[error("duplicate of the most recent submission for this location")]
    DuplicateSubmission,

    /// The location is not part of the registry the store was built with.
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The remote store answered with a status the client cannot map
    #[error("store returned unexpected status: {0}")]
    UnexpectedStatus(u16),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
