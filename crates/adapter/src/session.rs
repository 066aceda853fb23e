//! Read model of a provider-held session
//!
//! The session provider owns and mutates the underlying token state; adapters
//! only ever see this snapshot. A snapshot is either complete or absent
//! (`Option<Session>`), never half-built.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Error flag the session provider sets when silent renewal failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    RefreshTokenError,
}

/// Snapshot of a user's authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer credential for API calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Identity assertion, used when no access token is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Expiry of `access_token` as unix timestamp in milliseconds
    #[serde(default)]
    pub expires_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

impl Session {
    /// Token to present as a bearer credential.
    ///
    /// `None` when the refresh flag is set, whatever the token fields hold.
    /// Otherwise the access token, falling back to the identity token. Empty
    /// strings count as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        if self.error.is_some() {
            return None;
        }
        non_empty(self.access_token.as_deref()).or_else(|| non_empty(self.id_token.as_deref()))
    }
}

fn non_empty(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.is_empty())
}

/// Turn a session read into an adapter token result, logging why a token is
/// missing.
pub(crate) fn token_from_session(adapter: &str, session: Option<Session>) -> Option<String> {
    let Some(session) = session else {
        debug!(adapter, "no active session");
        return None;
    };

    if let Some(error) = session.error {
        warn!(adapter, ?error, "session refresh failed, treating user as signed out");
        return None;
    }

    let token = session.bearer_token().map(str::to_owned);
    if token.is_none() {
        debug!(adapter, "session has no usable token");
    }
    token
}
