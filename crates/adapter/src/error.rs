//! Error types for adapter operations

/// Errors from authenticated calls and session sign-out.
///
/// Token reads never produce these: `get_token` downgrades every session
/// failure to `None`.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An authenticated call was attempted with no token. Raised before any
    /// request is built.
    #[error("no authentication token available")]
    Unauthenticated,

    #[error("adapter {0} has no HTTP client configured")]
    Unsupported(String),

    /// Transport failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Backend answered with a non-success status. Passed through untouched.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("session error: {0}")]
    Session(String),
}

/// Result alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
