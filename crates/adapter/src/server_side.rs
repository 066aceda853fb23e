//! Adapter for server execution contexts.
//!
//! A server handler has no session hook to subscribe to, so the session read
//! is injected as a closure when the adapter is built (typically once per
//! request). Sign-out is a no-op here: a server context cannot terminate a
//! session the client holds.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::http::ClientFactory;
use crate::session::{Session, token_from_session};
use crate::AuthAdapter;

/// Injected session read used by `ServerAdapter`.
pub type SessionFetcher =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Option<Session>> + Send>> + Send + Sync>;

pub struct ServerAdapter {
    id: String,
    fetch: SessionFetcher,
    http: Option<Arc<dyn ClientFactory>>,
}

impl ServerAdapter {
    /// Build an adapter around a session-retrieval function.
    pub fn new<F, Fut>(id: impl Into<String>, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Session>> + Send + 'static,
    {
        let fetch: SessionFetcher = Arc::new(move || {
            Box::pin(fetcher()) as Pin<Box<dyn Future<Output = Option<Session>> + Send>>
        });
        Self {
            id: id.into(),
            fetch,
            http: None,
        }
    }

    pub fn with_client(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.http = Some(factory);
        self
    }
}

impl AuthAdapter for ServerAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn get_token(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        let read = (self.fetch)();
        Box::pin(async move { token_from_session(&self.id, read.await) })
    }

    fn sign_out(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        debug!(adapter = %self.id, "sign-out ignored in server context");
        Box::pin(async {})
    }

    fn client_factory(&self) -> Option<&dyn ClientFactory> {
        self.http.as_deref()
    }
}
