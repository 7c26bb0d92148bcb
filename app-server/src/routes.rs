//! API route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use jdrec_retrieval::{JdRecord, RecommendError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub position_name: String,
    /// Number of recommendations; the server default applies when absent.
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<JdRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertRequest {
    pub title: String,
    pub jd: String,
    /// Overwrite a corpus file that could not be parsed.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertResponse {
    pub status: String,
    pub message: String,
    pub replaced: bool,
    pub count: usize,
}

/// Rebuild the index from the corpus file.
pub async fn reload_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let summary = state
        .recommender
        .reindex()
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(StatusResponse {
        status: "success".to_string(),
        message: summary.message(),
    }))
}

/// Recommend job descriptions for a position title.
pub async fn recommend_job_description(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let recommendations = state
        .recommender
        .recommend(&request.position_name, request.k)
        .await?;

    Ok(Json(RecommendResponse { recommendations }))
}

/// Save a job description and rebuild the index.
pub async fn upsert_job_description(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
    let outcome = state
        .recommender
        .upsert(&request.title, &request.jd, request.force)
        .await
        .map_err(|e| match e {
            RecommendError::MalformedCorpus { .. } => {
                ApiError::new(StatusCode::CONFLICT, e.to_string())
            }
            other => ApiError::from(other),
        })?;

    info!(
        "Saved JD for {:?} ({} records indexed)",
        outcome.title, outcome.indexed
    );

    Ok(Json(UpsertResponse {
        status: "success".to_string(),
        message: format!(
            "JD for '{}' has been saved/updated; {} job descriptions loaded.",
            outcome.title, outcome.indexed
        ),
        replaced: outcome.replaced,
        count: outcome.indexed,
    }))
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let recommender = &state.recommender;
    let indexed = recommender.indexed_count().await;
    Json(serde_json::json!({
        "status": "ok",
        "service": "jdrec-server",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "collection": recommender.collection_name(),
        "indexed": indexed,
    }))
}
