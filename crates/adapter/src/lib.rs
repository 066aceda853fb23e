//! Authentication adapter contract
//!
//! Defines the `AuthAdapter` trait that lets callers obtain a bearer token, or
//! make an authenticated backend call, without knowing which identity provider
//! is in effect. Three variants implement it:
//!
//! - `ManagedAdapter`: providers that own their session and sign-out lifecycle
//!   (Clerk). Nearly a pass-through.
//! - `SessionAdapter`: reads a long-lived session handle (Okta sessions held
//!   by the local session provider). Sign-out invalidates the session.
//! - `ServerAdapter`: built per request around an injected session-fetch
//!   closure. Sign-out is a no-op.
//!
//! Adapters never cache tokens and never retry. Session-layer failures become
//! `None` from `get_token`; only an authenticated call without a token fails
//! with `AdapterError::Unauthenticated`, before any network I/O.

pub mod client_side;
pub mod error;
pub mod http;
pub mod managed;
pub mod select;
pub mod server_side;
pub mod session;

pub use client_side::{SessionAdapter, SessionSource};
pub use error::{AdapterError, Result};
pub use http::{ApiClient, ApiResponse, ClientFactory, ReqwestClientFactory};
pub use managed::{ManagedAdapter, ManagedSession};
pub use reqwest::Method;
pub use select::{ProviderKind, SelectedAdapter};
pub use server_side::ServerAdapter;
pub use session::{Session, SessionError};

use std::future::Future;
use std::pin::Pin;

use tracing::warn;

/// Uniform capability set over identity providers.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn AuthAdapter>`). Implementors provide `id`, `get_token` and
/// `sign_out`; the HTTP verbs are provided on top of `client_factory`.
pub trait AuthAdapter: Send + Sync {
    /// Provider label for logging (e.g. "clerk", "okta").
    fn id(&self) -> &str;

    /// Current bearer token, or `None` when the caller must sign in.
    ///
    /// Reads the session exactly once. Never fails: missing sessions and
    /// refresh errors both come back as `None`.
    fn get_token(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>>;

    /// Invalidate the session where the variant is able to. Always completes;
    /// failures are logged.
    fn sign_out(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Factory for bearer-authenticated clients. Adapters without one cannot
    /// issue HTTP calls and return `AdapterError::Unsupported`.
    fn client_factory(&self) -> Option<&dyn ClientFactory> {
        None
    }

    /// Issue an authenticated call.
    ///
    /// Fails with `Unauthenticated` before a client is even constructed when
    /// no token is available. Downstream failures are returned unchanged.
    fn request<'a>(
        &'a self,
        method: Method,
        url: &'a str,
        body: Option<serde_json::Value>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        Box::pin(async move {
            let factory = self
                .client_factory()
                .ok_or_else(|| AdapterError::Unsupported(self.id().to_string()))?;

            let Some(token) = self.get_token().await else {
                warn!(
                    adapter = self.id(),
                    %method,
                    url,
                    "no authentication token available, request not sent"
                );
                return Err(AdapterError::Unauthenticated);
            };

            let client = factory.authenticated(token);
            client.send(method, url, body).await
        })
    }

    fn get<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        self.request(Method::GET, url, None)
    }

    fn put<'a>(
        &'a self,
        url: &'a str,
        body: Option<serde_json::Value>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        self.request(Method::PUT, url, body)
    }

    fn post<'a>(
        &'a self,
        url: &'a str,
        body: Option<serde_json::Value>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        self.request(Method::POST, url, body)
    }

    fn delete<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        self.request(Method::DELETE, url, None)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fakes for adapter tests.

    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Client factory that counts constructions and never touches the network.
    #[derive(Default)]
    pub struct SpyFactory {
        pub built: AtomicUsize,
        pub sends: Arc<AtomicUsize>,
        pub tokens: std::sync::Mutex<Vec<String>>,
    }

    impl SpyFactory {
        pub fn built(&self) -> usize {
            self.built.load(Ordering::SeqCst)
        }

        pub fn sends(&self) -> usize {
            self.sends.load(Ordering::SeqCst)
        }
    }

    struct SpyClient {
        sends: Arc<AtomicUsize>,
    }

    impl ApiClient for SpyClient {
        fn send<'a>(
            &'a self,
            method: Method,
            url: &'a str,
            body: Option<serde_json::Value>,
        ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(ApiResponse {
                    data: serde_json::json!({
                        "method": method.as_str(),
                        "url": url,
                        "body": body,
                    }),
                    success: true,
                })
            })
        }
    }

    impl ClientFactory for SpyFactory {
        fn authenticated(&self, token: String) -> Box<dyn ApiClient> {
            self.built.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut tokens) = self.tokens.lock() {
                tokens.push(token);
            }
            Box::new(SpyClient {
                sends: self.sends.clone(),
            })
        }
    }
}
