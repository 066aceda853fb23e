//! Auth Gateway
//!
//! Single-binary backend-for-frontend that:
//! 1. Signs users in with the configured identity provider (Okta or Clerk)
//! 2. Holds Okta sessions and refreshes their tokens in the background
//! 3. Hands the current bearer token to the frontend
//! 4. Forwards `/api/*` calls to the backend with that token attached

mod auth;
mod config;
mod error;
mod metrics;
mod routes;

use std::sync::Arc;
use std::time::{Duration, Instant};

use adapter::{ClientFactory, ReqwestClientFactory};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use identity::{ClerkClient, OidcClient, OidcConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use session::{SessionStore, spawn_refresh_task};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::{AuthBackend, Authenticator, PendingSignIns};
use crate::config::{Config, ProviderConfig};

/// How long in-flight requests may drain after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    auth: Authenticator,
    pending: PendingSignIns,
    cookie_secure: bool,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// A concurrency limit layer caps in-flight requests at `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/auth/login", get(routes::login))
        .route("/auth/callback", get(routes::callback))
        .route("/auth/token", get(routes::token))
        .route("/auth/signout", post(routes::sign_out))
        .route("/api/{*path}", any(routes::api))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON output, LOG_LEVEL then RUST_LOG, default info
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting auth-gateway");

    // Install before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        backend_url = %config.server.backend_url,
        provider = %config.provider.kind(),
        "configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.server.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;
    let api: Arc<dyn ClientFactory> = Arc::new(ReqwestClientFactory::new(
        http.clone(),
        config.server.backend_url.clone(),
    ));

    let mut refresh_task = None;
    let backend = match config.provider {
        ProviderConfig::Okta(okta) => {
            let client_secret = okta
                .client_secret
                .context("okta client secret was not resolved")?;
            let oidc = Arc::new(OidcClient::new(
                http.clone(),
                OidcConfig {
                    issuer: okta.issuer,
                    client_id: okta.client_id,
                    client_secret,
                    redirect_uri: okta.redirect_uri,
                    scopes: okta.scopes,
                },
            ));

            let store = match &config.sessions.store_path {
                Some(path) => SessionStore::load(path.clone(), oidc.clone())
                    .await
                    .with_context(|| format!("failed to load sessions from {}", path.display()))?,
                None => {
                    warn!("no store_path configured, sessions will not survive a restart");
                    SessionStore::in_memory(oidc.clone())
                }
            };
            let store = Arc::new(store);
            info!(sessions = store.len().await, "session store ready");

            refresh_task = Some(spawn_refresh_task(
                store.clone(),
                config.sessions.refresh_interval(),
                config.sessions.refresh_threshold(),
            ));
            info!(
                interval_secs = config.sessions.refresh_interval_secs,
                threshold_secs = config.sessions.refresh_threshold_secs,
                "background token refresh started"
            );

            AuthBackend::Okta { oidc, store }
        }
        ProviderConfig::Clerk(clerk) => {
            let secret_key = clerk
                .secret_key
                .context("clerk secret key was not resolved")?;
            AuthBackend::Clerk {
                clerk: Arc::new(ClerkClient::new(http.clone(), clerk.api_url, secret_key)),
            }
        }
    };

    let app_state = AppState {
        auth: Authenticator::new(backend, api),
        pending: PendingSignIns::default(),
        cookie_secure: config.server.cookie_secure,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };
    if !app_state.cookie_secure {
        warn!("session cookie is not marked Secure");
    }

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    if let Some(task) = refresh_task {
        task.abort();
    }

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: provider, locally held sessions and uptime.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "provider": state.auth.provider(),
        "sessions": state.auth.session_count().await,
        "session_states": state.auth.session_states().await,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
