//! Error types for ad-break coordination

use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while coordinating an ad session.
///
/// Protocol misuse (calling a verb from a state where it makes no sense) and
/// timeouts are not errors: they are logged and the session carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A logic defect: e.g. restoring a snapshot that was never captured
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// The host reported a combination of facts that cannot happen
    #[error("Host inconsistency: {0}")]
    HostInconsistency(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// An inbound event name that is not part of the vocabulary
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// The worker thread owning the session has gone away
    #[error("Session worker closed: {0}")]
    WorkerClosed(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
