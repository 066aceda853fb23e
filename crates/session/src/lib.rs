//! Session provider for OIDC-federated sign-in
//!
//! Holds each signed-in user's token set (access, identity and refresh
//! tokens plus expiry) and keeps it fresh against the authorization server.
//! Adapters read sessions through `StoreSession`, which implements
//! `adapter::SessionSource`.
//!
//! Session lifecycle:
//! 1. Callback handler exchanges the code and calls `SessionStore::create`
//! 2. Every read runs the token state machine; an access token inside the
//!    refresh leeway triggers exactly one refresh attempt
//! 3. A failed refresh moves the session to `Errored` for good and reads
//!    carry `SessionError::RefreshTokenError`
//! 4. Sign-out removes the session
//! 5. A background task refreshes sessions proactively before they expire

pub mod error;
pub mod refresh;
pub mod state;
pub mod store;

pub use error::{Error, Result};
pub use refresh::spawn_refresh_task;
pub use state::{TokenAction, TokenEvent, TokenState, handle_event};
pub use store::{SessionRecord, SessionStore, StoreSession};

/// Current wall-clock time as unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
