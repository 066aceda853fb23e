//! Clerk backend API client
//!
//! Clerk owns the whole session lifecycle. The gateway only needs two calls:
//! mint a short-lived session token for an active session, and revoke a
//! session on sign-out. Both authenticate with the instance secret key.

use common::Secret;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Public Clerk backend API base URL.
pub const DEFAULT_API_URL: &str = "https://api.clerk.com";

#[derive(Debug, Deserialize)]
struct SessionTokenResponse {
    jwt: String,
}

pub struct ClerkClient {
    http: reqwest::Client,
    api_url: String,
    secret_key: Secret<String>,
}

impl ClerkClient {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        secret_key: Secret<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            secret_key,
        }
    }

    fn session_url(&self, session_id: &str, action: &str) -> Result<String> {
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Api(format!("malformed session id: {session_id:?}")));
        }
        Ok(format!(
            "{}/v1/sessions/{session_id}/{action}",
            self.api_url.trim_end_matches('/')
        ))
    }

    /// Mint a session token for `session_id`.
    ///
    /// Returns `Ok(None)` when Clerk does not know the session or it has
    /// ended (404/410).
    #[instrument(skip(self))]
    pub async fn session_token(&self, session_id: &str) -> Result<Option<String>> {
        let url = self.session_url(session_id, "tokens")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(self.secret_key.expose())
            .send()
            .await
            .map_err(|e| Error::Http(format!("session token request failed: {e}")))?;

        let status = response.status();
        if matches!(status.as_u16(), 404 | 410) {
            debug!(status = status.as_u16(), "clerk session not active");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Api(format!("session token returned {status}: {body}")));
        }

        let token = response
            .json::<SessionTokenResponse>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("session token: {e}")))?;
        Ok(Some(token.jwt))
    }

    /// Revoke `session_id`. An unknown session counts as already revoked.
    #[instrument(skip(self))]
    pub async fn revoke(&self, session_id: &str) -> Result<()> {
        let url = self.session_url(session_id, "revoke")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(self.secret_key.expose())
            .send()
            .await
            .map_err(|e| Error::Http(format!("session revoke request failed: {e}")))?;

        let status = response.status();
        if status.is_success() || status.as_u16() == 404 {
            return Ok(());
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        Err(Error::Api(format!("session revoke returned {status}: {body}")))
    }
}
