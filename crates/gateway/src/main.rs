//! Colonia API Gateway
//!
//! The single HTTP entry point of the tracker.
//! Handles:
//! - Systems, projects and progress updates
//! - Station requirement catalog browsing and refresh
//! - Live update websocket
//! - Static dashboard
//! - Observability (logging, metrics, tracing)

mod extract;
mod handlers;
mod middleware;
mod routes;

use colonia_common::{
    catalog::Catalog, config::AppConfig, db::DbPool, live::LiveUpdateBus, metrics,
    projects::ProjectStore, Repository,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub catalog: Catalog,
    pub projects: ProjectStore,
    pub bus: LiveUpdateBus,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DbPool, metrics: Option<PrometheusHandle>) -> Self {
        let repo = Repository::new(db.clone());
        Self {
            config,
            catalog: Catalog::new(repo.clone()),
            projects: ProjectStore::new(repo),
            db,
            bus: LiveUpdateBus::new(),
            metrics,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config);
    info!(
        service = %config.observability.service_name,
        "Starting Colonia API Gateway v{}",
        colonia_common::VERSION
    );

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Suffix("request_duration_seconds".into()),
                metrics::LATENCY_BUCKETS,
            )?
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Suffix(
                    "catalog_refresh_duration_seconds".into(),
                ),
                metrics::REFRESH_BUCKETS,
            )?
            .install_recorder()?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    db.ensure_schema().await?;

    let state = AppState::new(config.clone(), db, metrics_handle);
    let app = routes::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
