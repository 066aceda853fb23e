//! Provider selection.
//!
//! The provider is fixed by configuration at startup and carried alongside
//! the adapter as a tag, so call sites never probe the adapter's type.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::AuthAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Self-contained provider; manages its own sessions
    Clerk,
    /// OIDC federation; sessions held by the local session provider
    Okta,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Clerk => "clerk",
            ProviderKind::Okta => "okta",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An adapter tagged with the provider it was built for.
#[derive(Clone)]
pub struct SelectedAdapter {
    pub provider: ProviderKind,
    pub adapter: Arc<dyn AuthAdapter>,
}

impl SelectedAdapter {
    pub fn new(provider: ProviderKind, adapter: Arc<dyn AuthAdapter>) -> Self {
        Self { provider, adapter }
    }
}

impl fmt::Debug for SelectedAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedAdapter")
            .field("provider", &self.provider)
            .field("adapter", &self.adapter.id())
            .finish()
    }
}

impl std::ops::Deref for SelectedAdapter {
    type Target = dyn AuthAdapter;

    fn deref(&self) -> &Self::Target {
        self.adapter.as_ref()
    }
}
