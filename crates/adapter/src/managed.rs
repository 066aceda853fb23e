//! Adapter for providers that own their whole session lifecycle.
//!
//! The provider mints tokens and handles sign-out itself (Clerk's session
//! tokens and revocation). The adapter only downgrades provider errors to
//! "no token" so callers keep a single code path.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::http::ClientFactory;
use crate::AuthAdapter;

/// Provider-side session operations for self-managed providers.
pub trait ManagedSession: Send + Sync {
    /// Current session token. `Ok(None)` when the provider reports no active
    /// session.
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;

    fn sign_out(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

pub struct ManagedAdapter {
    id: String,
    session: Arc<dyn ManagedSession>,
    http: Option<Arc<dyn ClientFactory>>,
}

impl ManagedAdapter {
    pub fn new(id: impl Into<String>, session: Arc<dyn ManagedSession>) -> Self {
        Self {
            id: id.into(),
            session,
            http: None,
        }
    }

    pub fn with_client(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.http = Some(factory);
        self
    }
}

impl AuthAdapter for ManagedAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn get_token(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(async move {
            match self.session.token().await {
                Ok(Some(token)) if !token.is_empty() => Some(token),
                Ok(_) => {
                    debug!(adapter = %self.id, "provider reports no active session");
                    None
                }
                Err(e) => {
                    warn!(adapter = %self.id, error = %e, "provider token read failed");
                    None
                }
            }
        })
    }

    fn sign_out(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Err(e) = self.session.sign_out().await {
                warn!(adapter = %self.id, error = %e, "provider sign-out failed");
            }
        })
    }

    fn client_factory(&self) -> Option<&dyn ClientFactory> {
        self.http.as_deref()
    }
}
