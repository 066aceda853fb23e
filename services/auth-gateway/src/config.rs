//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Provider secrets come from OKTA_CLIENT_SECRET / CLERK_SECRET_KEY or a
//! secret file, never from the TOML itself.

use adapter::ProviderKind;
use common::{Secret, load_secret};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// Listener and backend settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub backend_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Mark the session cookie `Secure`. Disable only for plain-HTTP development.
    #[serde(default = "default_true")]
    pub cookie_secure: bool,
}

/// Identity provider, selected by `kind`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Okta(OktaConfig),
    Clerk(ClerkConfig),
}

#[derive(Debug, Deserialize)]
pub struct OktaConfig {
    pub issuer: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to OKTA_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct ClerkConfig {
    #[serde(default = "default_clerk_api_url")]
    pub api_url: String,
    #[serde(skip)]
    pub secret_key: Option<Secret<String>>,
    /// Path to a file containing the secret key (alternative to CLERK_SECRET_KEY)
    #[serde(default)]
    pub secret_key_file: Option<PathBuf>,
}

/// Session store and background refresh settings (Okta only)
#[derive(Debug, Deserialize)]
pub struct SessionsConfig {
    /// Persist sessions here; in-memory when absent
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            refresh_interval_secs: default_refresh_interval(),
            refresh_threshold_secs: default_refresh_threshold(),
        }
    }
}

impl SessionsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::Okta(_) => ProviderKind::Okta,
            ProviderConfig::Clerk(_) => ProviderKind::Clerk,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_scopes() -> String {
    identity::oidc::DEFAULT_SCOPES.to_string()
}

fn default_clerk_api_url() -> String {
    identity::clerk::DEFAULT_API_URL.to_string()
}

fn default_refresh_interval() -> u64 {
    300
}

fn default_refresh_threshold() -> u64 {
    900
}

fn require_http_url(field: &str, value: &str) -> common::Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(common::Error::Config(format!(
            "{field} must start with http:// or https://, got: {value}"
        )))
    }
}

fn require_non_zero(field: &str, value: u64) -> common::Result<()> {
    if value == 0 {
        return Err(common::Error::Config(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Secret resolution order:
    /// 1. OKTA_CLIENT_SECRET / CLERK_SECRET_KEY env var
    /// 2. client_secret_file / secret_key_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> common::Result<Self> {
        let mut config: Config = toml::from_str(contents)?;

        require_http_url("backend_url", &config.server.backend_url)?;
        require_non_zero("timeout_secs", config.server.timeout_secs)?;
        require_non_zero("max_connections", config.server.max_connections as u64)?;
        require_non_zero(
            "refresh_interval_secs",
            config.sessions.refresh_interval_secs,
        )?;
        require_non_zero(
            "refresh_threshold_secs",
            config.sessions.refresh_threshold_secs,
        )?;

        match &mut config.provider {
            ProviderConfig::Okta(okta) => {
                require_http_url("issuer", &okta.issuer)?;
                require_http_url("redirect_uri", &okta.redirect_uri)?;
                if okta.client_id.trim().is_empty() {
                    return Err(common::Error::Config("client_id must not be empty".into()));
                }
                okta.client_secret = load_secret(
                    "OKTA_CLIENT_SECRET",
                    okta.client_secret_file.as_deref(),
                )?;
                if okta.client_secret.is_none() {
                    return Err(common::Error::Config(
                        "okta client secret missing: set OKTA_CLIENT_SECRET or client_secret_file"
                            .into(),
                    ));
                }
            }
            ProviderConfig::Clerk(clerk) => {
                require_http_url("api_url", &clerk.api_url)?;
                clerk.secret_key =
                    load_secret("CLERK_SECRET_KEY", clerk.secret_key_file.as_deref())?;
                if clerk.secret_key.is_none() {
                    return Err(common::Error::Config(
                        "clerk secret key missing: set CLERK_SECRET_KEY or secret_key_file".into(),
                    ));
                }
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("auth-gateway.toml")
    }
}
