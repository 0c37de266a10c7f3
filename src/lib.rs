pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod store;
pub mod validation;

pub use config::{CliArgs, ServerConfig};
pub use error::{ApiError, ErrorCode};
pub use logging::{LoggingConfig, init_logging};
pub use model::{NewRepository, Repository, RepositoryChanges, RepositoryId};
pub use shutdown::{ShutdownConfig, ShutdownCoordinator};
pub use state::AppState;
pub use store::{RepositoryStore, StoreError, StoreStats, UpdateMode};

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> (axum::http::StatusCode, String) {
    (axum::http::StatusCode::OK, metrics::METRICS.encode())
}

/// Full application router: repository routes plus health and metrics.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors_enabled = state.config().cors_enabled;
    let health_checker = Arc::new(health::HealthChecker::new(state.clone()));

    let operational = Router::new()
        .route("/health", axum::routing::get(health::liveness_handler))
        .route("/ready", axum::routing::get(health::readiness_handler))
        .route("/metrics", axum::routing::get(metrics_handler))
        .with_state(health_checker);

    let router = server::repository_routes(state)
        .merge(operational)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    use shutdown::{CompositeShutdownHandler, StoreShutdownHandler};

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone()));

    let shutdown_config =
        ShutdownConfig::default().with_total_timeout(config.graceful_shutdown_timeout_secs);
    let coordinator = Arc::new(ShutdownCoordinator::new(
        shutdown_config,
        state.shutdown_token(),
    ));

    let mut composite_handler = CompositeShutdownHandler::new();
    composite_handler.add_handler(Box::new(StoreShutdownHandler::new(state.clone())));

    let router = build_router(state.clone());
    let listener = TcpListener::bind(config.http_bind_address).await?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(
        bind = %actual_addr,
        update_mode = %config.update_mode,
        cors = config.cors_enabled,
        "listening"
    );

    let signal_coordinator = coordinator.clone();
    let server_result = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            signal_coordinator.wait_for_signal().await;
        })
        .await;

    tracing::info!("server stopped, running shutdown handlers");
    if let Err(e) = coordinator.shutdown(&composite_handler).await {
        tracing::error!("error during shutdown: {}", e);
    }
    tracing::info!(phase = %coordinator.phase(), "shutdown finished");

    server_result.map_err(anyhow::Error::from)
}
