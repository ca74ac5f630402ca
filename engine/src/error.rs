//! Error types for NIPPU

use nippu_core::Category;
use thiserror::Error;

// Re-export SinkError from nippu-core
pub use nippu_core::SinkError;

/// Result type alias for NIPPU engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for the NIPPU engine
///
/// Only `Config` is ever fatal, and only at startup. A `Rejected` event is
/// surfaced synchronously to the submitting caller and never buffered.
/// `Invariant` describes states the engine treats as logged no-ops (for
/// example a flush firing for an entry that was already drained); it exists
/// so those states have a name, not so they can crash anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Configuration error (the only fatal path, at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// No delivery target configured for the event's category
    #[error("no delivery target configured for category '{0}'")]
    Rejected(Category),

    /// Internal invariant violated; treated as a logged no-op
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The engine has shut down and accepts no further work
    #[error("engine shut down: {0}")]
    Shutdown(String),
}

/// Map a reqwest failure onto the sink error taxonomy.
///
/// Shared by every HTTP-posting sink so timeouts and refused connections
/// classify the same way everywhere.
pub(crate) fn classify_http_error(error: reqwest::Error) -> SinkError {
    if error.is_timeout() {
        SinkError::Timeout(error.to_string())
    } else if error.is_connect() {
        SinkError::Connection(error.to_string())
    } else {
        SinkError::Send(error.to_string())
    }
}
