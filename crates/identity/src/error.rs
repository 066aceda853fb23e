//! Error types for identity provider calls

/// Errors from identity provider endpoints.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The provider rejected the grant (revoked or expired refresh token,
    /// reused authorization code). Not retryable.
    #[error("grant rejected: {0}")]
    InvalidGrant(String),

    #[error("token endpoint error: {0}")]
    TokenEndpoint(String),

    #[error("provider API error: {0}")]
    Api(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Result alias for identity operations.
pub type Result<T> = std::result::Result<T, Error>;
