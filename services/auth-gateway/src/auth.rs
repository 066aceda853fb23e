//! Provider wiring for the gateway.
//!
//! Builds the adapter each request needs from the configured provider and the
//! caller's cookies. Okta sessions live in the local `SessionStore` keyed by
//! the `gw_session` cookie; Clerk sessions live at Clerk and are addressed by
//! the Clerk session id cookie.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use adapter::{
    AdapterError, ClientFactory, ManagedAdapter, ManagedSession, ProviderKind, SelectedAdapter,
    ServerAdapter, SessionAdapter,
};
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use identity::{ClerkClient, OidcClient};
use session::SessionStore;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Cookie carrying the local session id (Okta).
pub const SESSION_COOKIE: &str = "gw_session";

/// Cookie carrying the Clerk session id.
pub const CLERK_SESSION_COOKIE: &str = "__clerk_session_id";

/// How long a started sign-in may wait for its callback.
pub const SIGN_IN_EXPIRY: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub enum AuthBackend {
    Okta {
        oidc: Arc<OidcClient>,
        store: Arc<SessionStore>,
    },
    Clerk {
        clerk: Arc<ClerkClient>,
    },
}

/// Per-request adapter construction over the configured provider.
#[derive(Clone)]
pub struct Authenticator {
    backend: AuthBackend,
    api: Arc<dyn ClientFactory>,
}

impl Authenticator {
    pub fn new(backend: AuthBackend, api: Arc<dyn ClientFactory>) -> Self {
        Self { backend, api }
    }

    pub fn provider(&self) -> ProviderKind {
        match self.backend {
            AuthBackend::Okta { .. } => ProviderKind::Okta,
            AuthBackend::Clerk { .. } => ProviderKind::Clerk,
        }
    }

    pub fn backend(&self) -> &AuthBackend {
        &self.backend
    }

    /// Adapter for token reads and backend calls on behalf of this request.
    ///
    /// Okta gets a server-side adapter whose fetcher reads the cookie session
    /// from the store; a request without the cookie yields no session.
    pub fn request_adapter(&self, headers: &HeaderMap) -> SelectedAdapter {
        match &self.backend {
            AuthBackend::Okta { store, .. } => {
                let store = store.clone();
                let session_id = cookie_value(headers, SESSION_COOKIE);
                let adapter = ServerAdapter::new(ProviderKind::Okta.label(), move || {
                    let store = store.clone();
                    let session_id = session_id.clone();
                    async move {
                        match session_id {
                            Some(id) => store.session(&id).await,
                            None => None,
                        }
                    }
                })
                .with_client(self.api.clone());
                SelectedAdapter::new(ProviderKind::Okta, Arc::new(adapter))
            }
            AuthBackend::Clerk { clerk } => {
                self.clerk_adapter(clerk, cookie_value(headers, CLERK_SESSION_COOKIE))
            }
        }
    }

    /// Adapter able to end the caller's session, if the request carries one.
    ///
    /// Okta uses the client-side adapter bound to the cookie session so that
    /// signing out removes it from the store.
    pub fn sign_out_adapter(&self, headers: &HeaderMap) -> Option<SelectedAdapter> {
        match &self.backend {
            AuthBackend::Okta { store, .. } => {
                let session_id = cookie_value(headers, SESSION_COOKIE)?;
                let adapter = SessionAdapter::new(
                    ProviderKind::Okta.label(),
                    Arc::new(store.handle(session_id)),
                )
                .with_client(self.api.clone());
                Some(SelectedAdapter::new(ProviderKind::Okta, Arc::new(adapter)))
            }
            AuthBackend::Clerk { clerk } => {
                let session_id = cookie_value(headers, CLERK_SESSION_COOKIE)?;
                Some(self.clerk_adapter(clerk, Some(session_id)))
            }
        }
    }

    /// Number of locally held sessions. Clerk holds none.
    pub async fn session_count(&self) -> usize {
        match &self.backend {
            AuthBackend::Okta { store, .. } => store.len().await,
            AuthBackend::Clerk { .. } => 0,
        }
    }

    /// Local sessions per token state (`valid`, `expired`, ...). Empty for
    /// Clerk.
    pub async fn session_states(&self) -> HashMap<&'static str, usize> {
        match &self.backend {
            AuthBackend::Okta { store, .. } => store.state_counts().await,
            AuthBackend::Clerk { .. } => HashMap::new(),
        }
    }

    fn clerk_adapter(
        &self,
        clerk: &Arc<ClerkClient>,
        session_id: Option<String>,
    ) -> SelectedAdapter {
        let session = ClerkSession {
            clerk: clerk.clone(),
            session_id,
        };
        let adapter = ManagedAdapter::new(ProviderKind::Clerk.label(), Arc::new(session))
            .with_client(self.api.clone());
        SelectedAdapter::new(ProviderKind::Clerk, Arc::new(adapter))
    }
}

/// One caller's Clerk session.
struct ClerkSession {
    clerk: Arc<ClerkClient>,
    session_id: Option<String>,
}

impl ManagedSession for ClerkSession {
    fn token(
        &self,
    ) -> Pin<Box<dyn Future<Output = adapter::Result<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            let Some(id) = self.session_id.as_deref() else {
                return Ok(None);
            };
            self.clerk
                .session_token(id)
                .await
                .map_err(|e| AdapterError::Session(e.to_string()))
        })
    }

    fn sign_out(&self) -> Pin<Box<dyn Future<Output = adapter::Result<()>> + Send + '_>> {
        Box::pin(async move {
            let Some(id) = self.session_id.as_deref() else {
                debug!("no clerk session to revoke");
                return Ok(());
            };
            self.clerk
                .revoke(id)
                .await
                .map_err(|e| AdapterError::Session(e.to_string()))
        })
    }
}

/// PKCE verifier waiting for its callback.
struct PendingSignIn {
    verifier: String,
    created_at: Instant,
}

/// Sign-ins started by `/auth/login`, keyed by the `state` parameter.
#[derive(Clone, Default)]
pub struct PendingSignIns {
    inner: Arc<Mutex<HashMap<String, PendingSignIn>>>,
}

impl PendingSignIns {
    pub async fn insert(&self, state: String, verifier: String) {
        let mut pending = self.inner.lock().await;
        // Lazy cleanup while holding the lock
        pending.retain(|_, p| p.created_at.elapsed() < SIGN_IN_EXPIRY);
        pending.insert(
            state,
            PendingSignIn {
                verifier,
                created_at: Instant::now(),
            },
        );
    }

    /// Consume the verifier for `state`. Unknown and expired states both
    /// yield `None`; a state can be used once.
    pub async fn take(&self, state: &str) -> Option<String> {
        let pending = self.inner.lock().await.remove(state)?;
        if pending.created_at.elapsed() >= SIGN_IN_EXPIRY {
            debug!("sign-in state expired");
            return None;
        }
        Some(pending.verifier)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Value of cookie `name`, if present and non-empty.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value binding the browser to session `id`.
pub fn session_cookie(id: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax{secure}")
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{secure}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter::ReqwestClientFactory;
    use axum::http::HeaderValue;
    use common::Secret;
    use identity::{OidcConfig, TokenResponse};

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn unused_oidc() -> Arc<OidcClient> {
        Arc::new(OidcClient::new(
            reqwest::Client::new(),
            OidcConfig {
                issuer: "http://127.0.0.1:9/oauth2/default".into(),
                client_id: "client".into(),
                client_secret: Secret::new("secret".to_string()),
                redirect_uri: "http://localhost/auth/callback".into(),
                scopes: identity::oidc::DEFAULT_SCOPES.into(),
            },
        ))
    }

    fn okta_authenticator() -> (Authenticator, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::in_memory(unused_oidc()));
        let api: Arc<dyn ClientFactory> = Arc::new(ReqwestClientFactory::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
        ));
        let auth = Authenticator::new(
            AuthBackend::Okta {
                oidc: unused_oidc(),
                store: store.clone(),
            },
            api,
        );
        (auth, store)
    }

    fn tokens() -> TokenResponse {
        TokenResponse {
            access_token: "at_cookie".into(),
            id_token: Some("id_cookie".into()),
            expires_in: 3600,
            refresh_token: Some("rt_cookie".into()),
            token_type: Some("Bearer".into()),
            scope: None,
        }
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let headers = headers_with_cookie("theme=dark; gw_session=abc123; other=1");
        assert_eq!(
            cookie_value(&headers, SESSION_COOKIE).as_deref(),
            Some("abc123")
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cookie_value_ignores_empty_and_searches_all_headers() {
        let mut headers = headers_with_cookie("gw_session=");
        assert_eq!(cookie_value(&headers, SESSION_COOKIE), None);

        headers.append(COOKIE, HeaderValue::from_static("__clerk_session_id=sess_1"));
        assert_eq!(
            cookie_value(&headers, CLERK_SESSION_COOKIE).as_deref(),
            Some("sess_1")
        );
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("abc", true);
        assert!(cookie.starts_with("gw_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.ends_with("; Secure"));

        assert!(!session_cookie("abc", false).contains("Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn okta_request_adapter_reads_cookie_session() {
        let (auth, store) = okta_authenticator();
        let id = store.create(tokens()).await.unwrap();

        let adapter = auth.request_adapter(&headers_with_cookie(&format!("gw_session={id}")));
        assert_eq!(adapter.provider, ProviderKind::Okta);
        assert_eq!(adapter.get_token().await.as_deref(), Some("at_cookie"));
    }

    #[tokio::test]
    async fn okta_request_adapter_without_cookie_has_no_token() {
        let (auth, store) = okta_authenticator();
        store.create(tokens()).await.unwrap();

        let adapter = auth.request_adapter(&HeaderMap::new());
        assert_eq!(adapter.get_token().await, None);

        let unknown = auth.request_adapter(&headers_with_cookie("gw_session=nope"));
        assert_eq!(unknown.get_token().await, None);
    }

    #[tokio::test]
    async fn okta_sign_out_removes_cookie_session() {
        let (auth, store) = okta_authenticator();
        let id = store.create(tokens()).await.unwrap();
        assert!(auth.sign_out_adapter(&HeaderMap::new()).is_none());

        let headers = headers_with_cookie(&format!("gw_session={id}"));
        let adapter = auth.sign_out_adapter(&headers).unwrap();
        adapter.sign_out().await;

        assert_eq!(auth.session_count().await, 0);
        assert_eq!(auth.request_adapter(&headers).get_token().await, None);
    }

    #[tokio::test]
    async fn clerk_adapter_without_session_cookie_has_no_token() {
        let clerk = Arc::new(ClerkClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            Secret::new("sk_test".to_string()),
        ));
        let api: Arc<dyn ClientFactory> = Arc::new(ReqwestClientFactory::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
        ));
        let auth = Authenticator::new(AuthBackend::Clerk { clerk }, api);

        let adapter = auth.request_adapter(&HeaderMap::new());
        assert_eq!(adapter.provider, ProviderKind::Clerk);
        assert_eq!(adapter.get_token().await, None);
        assert!(auth.sign_out_adapter(&HeaderMap::new()).is_none());
        assert_eq!(auth.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_sign_in_is_single_use_and_expires() {
        let pending = PendingSignIns::default();
        pending.insert("s1".into(), "v1".into()).await;
        pending.insert("s2".into(), "v2".into()).await;

        assert_eq!(pending.take("s1").await.as_deref(), Some("v1"));
        assert_eq!(pending.take("s1").await, None);

        tokio::time::advance(SIGN_IN_EXPIRY + Duration::from_secs(1)).await;
        assert_eq!(pending.take("s2").await, None);

        pending.insert("s3".into(), "v3".into()).await;
        assert_eq!(pending.len().await, 1);
    }
}
