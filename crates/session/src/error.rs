//! Error types for session store operations

/// Errors from session persistence. Refresh failures never surface here;
/// they become `TokenState::Errored` on the session instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("session file parse error: {0}")]
    Parse(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
