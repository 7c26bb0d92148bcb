//! HTTP server implementation using Axum.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use jdrec_retrieval::JdRecommender;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::routes;

/// Shared state for the server.
pub struct AppState {
    pub recommender: Arc<JdRecommender>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(recommender: Arc<JdRecommender>) -> Self {
        Self {
            recommender,
            started_at: Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/reload_data/", post(routes::reload_data))
        .route(
            "/recommend_job_description/",
            post(routes::recommend_job_description),
        )
        .route(
            "/upsert_job_description/",
            post(routes::upsert_job_description),
        )
        .route("/health", get(routes::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Build the recommender, index the corpus, and serve until Ctrl-C.
///
/// A failed startup reindex is logged and the server starts anyway; the
/// index can be rebuilt later through `/reload_data/`.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let recommender = JdRecommender::from_config(config.recommender.clone())
        .await
        .context("failed to initialize recommender")?;
    let recommender = Arc::new(recommender);

    match recommender.reindex().await {
        Ok(summary) => info!("Startup reload: {}", summary.message()),
        Err(e) => error!("Failed to load data on startup: {e}"),
    }

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, build_router(AppState::new(recommender)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
