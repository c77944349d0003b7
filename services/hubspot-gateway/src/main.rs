//! HubSpot integration gateway
//!
//! Single-binary service that:
//! 1. Redirects users to HubSpot's OAuth consent page
//! 2. Exchanges the callback's authorization code for tokens
//! 3. Persists the token payload per (user, organization)
//! 4. Serves the user's CRM contacts reshaped for display

mod config;
mod error;
mod metrics;
mod routes;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use hubspot_auth::{
    CredentialStore, FileStore, KeyValueStore, MemoryStore, OAuthSettings, RedisStore,
    StateManager,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, StoreBackend, StoreConfig};

/// How long in-flight requests may take to finish after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub oauth: Arc<OAuthSettings>,
    pub states: Arc<StateManager>,
    pub store: CredentialStore,
    pub started_at: Instant,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` caps concurrently handled requests.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/integrations/hubspot/authorize", get(routes::authorize))
        .route("/oauth2callback/hubspot", get(routes::oauth_callback))
        .route("/integrations/hubspot/credentials", get(routes::credentials))
        .route("/integrations/hubspot/items", get(routes::items))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Open the configured credential backend.
async fn open_store(config: &StoreConfig) -> Result<CredentialStore> {
    let backend: Arc<dyn KeyValueStore> = match config.backend {
        StoreBackend::Redis => Arc::new(
            RedisStore::connect(&config.redis_url)
                .await
                .context("failed to connect to redis credential store")?,
        ),
        StoreBackend::File => Arc::new(
            FileStore::load(config.path.clone())
                .await
                .with_context(|| format!("failed to open {}", config.path.display()))?,
        ),
        StoreBackend::Memory => {
            warn!("using in-memory credential store, credentials are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(CredentialStore::new(backend))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the subscriber so LOG_LEVEL can come from it
    let dotenv_result = dotenvy::dotenv();

    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    match dotenv_result {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to load .env"),
    }

    info!("starting hubspot-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder()?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let oauth = config.oauth_settings()?;

    info!(
        listen_addr = %config.server.listen_addr,
        api_base_url = %oauth.api_base_url,
        redirect_uri = %oauth.redirect_uri,
        state_mode = ?config.hubspot.state_mode,
        store = ?config.store.backend,
        "configuration loaded"
    );

    let store = open_store(&config.store).await?;

    let http_client = reqwest::Client::builder()
        .timeout(config.vendor_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let app_state = AppState {
        http_client,
        oauth: Arc::new(oauth),
        states: Arc::new(
            StateManager::new(config.hubspot.state_mode, config.state_ttl())
                .with_max_pending(config.hubspot.max_pending_states),
        ),
        store,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: notify the server to drain, then race it against the timer.
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

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Liveness plus the credential backend in use.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "integration": "hubspot",
        "store": state.store.backend(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint: returns metrics in text exposition format.
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
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use common::Secret;
    use hubspot_auth::StateMode;
    use tower::ServiceExt;

    fn test_app_state(store: CredentialStore) -> AppState {
        AppState {
            http_client: reqwest::Client::new(),
            oauth: Arc::new(OAuthSettings::new("cid", Secret::new("secret".into()))),
            states: Arc::new(StateManager::new(
                StateMode::Opaque,
                Duration::from_secs(600),
            )),
            store,
            started_at: Instant::now(),
            prometheus: crate::metrics::local_handle(),
        }
    }

    fn memory_store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn health_endpoint_reports_store_backend() {
        let app = build_router(test_app_state(memory_store()), 100);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["integration"], "hubspot");
        assert_eq!(json["store"], "memory");
        assert!(json["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_prometheus_format() {
        let app = build_router(test_app_state(memory_store()), 100);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = build_router(test_app_state(memory_store()), 100);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn open_store_file_backend_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let config = StoreConfig {
            backend: StoreBackend::File,
            redis_url: String::new(),
            path: path.clone(),
        };

        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend(), "file");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn open_store_memory_backend() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            redis_url: String::new(),
            path: "unused.json".into(),
        };

        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }
}
