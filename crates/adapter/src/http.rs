//! Bearer-authenticated HTTP client
//!
//! `ClientFactory` turns a token into an `ApiClient` that exposes a single
//! `send` entry point; the adapter's GET/PUT/POST/DELETE helpers all funnel
//! through it. The reqwest implementation joins relative URLs onto the
//! backend base URL and normalizes response bodies into `ApiResponse`.

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{AdapterError, Result};

/// Uniform result envelope for authenticated calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub data: T,
    pub success: bool,
}

impl ApiResponse {
    /// Deserialize `data` into a concrete type, keeping the success flag.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ApiResponse<T>> {
        let data = serde_json::from_value(self.data)
            .map_err(|e| AdapterError::Decode(e.to_string()))?;
        Ok(ApiResponse {
            data,
            success: self.success,
        })
    }

    /// Build an envelope from a raw response body.
    ///
    /// A JSON object carrying a boolean `success` is already an envelope.
    /// Any other JSON becomes `data`; an empty body is `null`; anything that
    /// is not JSON is kept as a string.
    pub fn from_body(body: &str) -> Self {
        if body.trim().is_empty() {
            return Self {
                data: serde_json::Value::Null,
                success: true,
            };
        }

        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(mut map)) => match map.get("success") {
                Some(serde_json::Value::Bool(success)) => {
                    let success = *success;
                    let data = map.remove("data").unwrap_or(serde_json::Value::Null);
                    Self { data, success }
                }
                _ => Self {
                    data: serde_json::Value::Object(map),
                    success: true,
                },
            },
            Ok(other) => Self {
                data: other,
                success: true,
            },
            Err(_) => Self {
                data: serde_json::Value::String(body.to_owned()),
                success: true,
            },
        }
    }
}

/// A client already bound to one bearer token.
pub trait ApiClient: Send + Sync {
    fn send<'a>(
        &'a self,
        method: Method,
        url: &'a str,
        body: Option<serde_json::Value>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>>;
}

/// Builds token-bound clients. Adapters hold one and call it only after a
/// token has been obtained.
pub trait ClientFactory: Send + Sync {
    fn authenticated(&self, token: String) -> Box<dyn ApiClient>;
}

/// `ClientFactory` over a shared `reqwest::Client`.
///
/// Timeouts and connection pooling come from the injected client.
#[derive(Clone)]
pub struct ReqwestClientFactory {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestClientFactory {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl ClientFactory for ReqwestClientFactory {
    fn authenticated(&self, token: String) -> Box<dyn ApiClient> {
        Box::new(BearerClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Secret::new(token),
        })
    }
}

struct BearerClient {
    client: reqwest::Client,
    base_url: String,
    token: Secret<String>,
}

impl ApiClient for BearerClient {
    fn send<'a>(
        &'a self,
        method: Method,
        url: &'a str,
        body: Option<serde_json::Value>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        Box::pin(self.execute(method, url, body))
    }
}

impl BearerClient {
    #[instrument(skip_all, fields(method = %method, url = %url))]
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        let target = join_url(&self.base_url, url);
        let mut request = self
            .client
            .request(method, target.as_str())
            .bearer_auth(self.token.expose());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Http(format!("{target}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AdapterError::Http(format!("reading response body: {e}")))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "backend returned error status");
            return Err(AdapterError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(ApiResponse::from_body(&text))
    }
}

/// Resolve `url` against `base`. Absolute http(s) URLs pass through.
fn join_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_owned();
    }
    let base = base.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}
