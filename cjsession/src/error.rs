//! Error types for cjsession

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the session runtime
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session worker is gone; commands can no longer be delivered.
    #[error("session for location {0} is closed")]
    SessionClosed(String),

    /// A session is already running for the location.
    #[error("session for location {0} is already open")]
    SessionExists(String),

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
