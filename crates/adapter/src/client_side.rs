//! Adapter over a long-lived session handle.
//!
//! The session provider keeps the token state (and refreshes it); the
//! adapter reads a fresh snapshot on every `get_token` and asks the provider
//! to invalidate the session on `sign_out`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::http::ClientFactory;
use crate::session::{Session, token_from_session};
use crate::AuthAdapter;

/// Read/sign-out access to one session held by a session provider.
pub trait SessionSource: Send + Sync {
    /// Snapshot of the current session, or `None` when signed out.
    fn current(&self) -> Pin<Box<dyn Future<Output = Option<Session>> + Send + '_>>;

    /// Invalidate the session at the provider.
    fn sign_out(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

pub struct SessionAdapter {
    id: String,
    source: Arc<dyn SessionSource>,
    http: Option<Arc<dyn ClientFactory>>,
}

impl SessionAdapter {
    pub fn new(id: impl Into<String>, source: Arc<dyn SessionSource>) -> Self {
        Self {
            id: id.into(),
            source,
            http: None,
        }
    }

    pub fn with_client(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.http = Some(factory);
        self
    }
}

impl AuthAdapter for SessionAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn get_token(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(async move {
            let session = self.source.current().await;
            token_from_session(&self.id, session)
        })
    }

    fn sign_out(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            match self.source.sign_out().await {
                Ok(()) => info!(adapter = %self.id, "session signed out"),
                Err(e) => warn!(adapter = %self.id, error = %e, "session sign-out failed"),
            }
        })
    }

    fn client_factory(&self) -> Option<&dyn ClientFactory> {
        self.http.as_deref()
    }
}
