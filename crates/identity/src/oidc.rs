//! OIDC client for Okta authorization servers
//!
//! Handles the three interactions with the authorization server:
//! 1. Building the authorization URL (code flow, S256 PKCE)
//! 2. Authorization code exchange
//! 3. Refresh-token grant
//!
//! Token endpoint calls authenticate the client with HTTP Basic auth
//! (`client_secret_basic`). Endpoints follow Okta's layout under the issuer:
//! `{issuer}/v1/authorize` and `{issuer}/v1/token`.

use common::Secret;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Scopes requested when none are configured. `offline_access` is what makes
/// the server issue a refresh token.
pub const DEFAULT_SCOPES: &str = "openid profile email offline_access";

/// Static client registration for one authorization server.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Issuer URL, e.g. `https://example.okta.com/oauth2/default`
    pub issuer: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub scopes: String,
}

/// Token endpoint response for both code exchange and refresh.
///
/// `expires_in` is a delta in seconds; callers convert it to an absolute
/// timestamp when storing. `refresh_token` is only present on refresh when
/// the server rotates it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Absolute expiry in unix milliseconds, given the time the response was
    /// received.
    pub fn expires_at_millis(&self, received_at_millis: u64) -> u64 {
        received_at_millis.saturating_add(self.expires_in.saturating_mul(1000))
    }
}

pub struct OidcClient {
    http: reqwest::Client,
    config: OidcConfig,
}

impl OidcClient {
    pub fn new(http: reqwest::Client, config: OidcConfig) -> Self {
        Self { http, config }
    }

    pub fn authorize_endpoint(&self) -> String {
        format!("{}/v1/authorize", self.config.issuer.trim_end_matches('/'))
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/v1/token", self.config.issuer.trim_end_matches('/'))
    }

    /// Authorization URL for the code flow with an S256 PKCE challenge.
    pub fn authorization_url(&self, state: &str, challenge: &str) -> Result<String> {
        let mut url = Url::parse(&self.authorize_endpoint())
            .map_err(|e| Error::InvalidResponse(format!("invalid issuer URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", state)
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url.into())
    }

    /// Exchange an authorization code (plus the PKCE verifier that produced
    /// its challenge) for a token set.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenResponse> {
        self.token_request(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("code_verifier", verifier),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ],
            "code exchange",
        )
        .await
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// One request, no retry. A rejected grant comes back as
    /// `Error::InvalidGrant`.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.token_request(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", self.config.scopes.as_str()),
            ],
            "token refresh",
        )
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)], operation: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.token_endpoint())
            .basic_auth(&self.config.client_id, Some(self.config.client_secret.expose()))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{operation} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));

            // 400 invalid_grant, 401 invalid_client, 403: the grant will
            // never succeed as-is
            if matches!(status.as_u16(), 400 | 401 | 403) {
                return Err(Error::InvalidGrant(format!(
                    "{operation} rejected ({status}): {body}"
                )));
            }

            return Err(Error::TokenEndpoint(format!(
                "{operation} returned {status}: {body}"
            )));
        }

        let tokens = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("{operation}: {e}")))?;
        debug!(
            operation,
            expires_in = tokens.expires_in,
            rotated = tokens.refresh_token.is_some(),
            "token endpoint succeeded"
        );
        Ok(tokens)
    }
}
