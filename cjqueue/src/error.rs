//! Error types for cjqueue

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the queue core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The fallback library has no tracks; a location cannot operate
    /// without filler content.
    #[error("track library is empty")]
    EmptyLibrary,

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
