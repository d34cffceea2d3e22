//! QuickBooks Report Server
//!
//! Single-binary service that:
//! 1. Keeps a refresh token for one QuickBooks company on disk, rotating it
//!    as the provider issues new ones
//! 2. Serves `/report`: bank balances, recent purchases and deposits, and
//!    classes as one JSON document
//! 3. Runs the OAuth consent flow via `/login` and `/callback`

mod config;
mod error;
mod factory;
mod metrics;
mod report;
mod routes;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;
use quickbooks_auth::{FileTokenStore, RefreshTokenStore, TokenSource, seed_if_empty};

use crate::config::Config;
use crate::factory::ClientFactory;
use crate::metrics::ServiceMetrics;
use crate::report::ReportSettings;

/// Time allowed for in-flight requests after a shutdown signal. Covers one
/// token exchange plus the four report queries on a slow upstream.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    tokens: Arc<TokenSource>,
    factory: ClientFactory,
    settings: Arc<ReportSettings>,
    metrics: ServiceMetrics,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// At most `max_connections` requests are processed concurrently.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/report", get(routes::report_handler))
        .route("/login", get(routes::login_handler))
        .route("/callback", get(routes::callback_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the filter is built so LOG_LEVEL can come from it
    let dotenv = dotenvy::dotenv();

    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting qbo-report-server");
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "ignoring unreadable environment file"),
    }

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install metrics recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    match &config_path {
        Some(path) => info!(path = %path.display(), "loading configuration"),
        None => info!("no config file, using environment and defaults"),
    }
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    info!(
        listen_addr = %config.server.listen_addr,
        api_base_url = %config.quickbooks.api_base_url,
        token_file = %config.quickbooks.token_file.display(),
        realm_id = %config.credentials.realm_id,
        "configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.quickbooks.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let store: Arc<dyn RefreshTokenStore> =
        Arc::new(FileTokenStore::new(config.quickbooks.token_file.clone()));
    let seeded = seed_if_empty(
        store.as_ref(),
        config.credentials.bootstrap_refresh_token.expose(),
    )
    .await
    .context("failed to seed token store")?;
    if !seeded {
        info!("using refresh token already in token store");
    }

    let tokens = Arc::new(TokenSource::new(http.clone(), config.oauth_config(), store));
    let factory = ClientFactory::new(
        http,
        config.quickbooks.api_base_url.clone(),
        config.credentials.realm_id.clone(),
        tokens.clone(),
    );

    let app_state = AppState {
        tokens,
        factory,
        settings: Arc::new(config.report_settings()),
        metrics: ServiceMetrics::new(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires: the server is
    // told to stop accepting, then the drain races DRAIN_TIMEOUT.
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

/// Liveness plus request counters. Does not touch the upstream.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "realm_id": state.factory.realm_id(),
        "uptime_seconds": state.metrics.started_at.elapsed().as_secs(),
        "requests_served": state.metrics.requests_total.load(Ordering::Relaxed),
        "errors_total": state.metrics.errors_total.load(Ordering::Relaxed),
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
