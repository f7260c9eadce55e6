//! HTTP handlers
//!
//! Every recommendation endpoint returns a JSON array of entity objects.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use recflow_core::{Entity, EntityId, Flow, Stage};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "recflow-pd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

pub fn recommend_routes() -> Router<AppState> {
    Router::new()
        .route("/recommend/songs/:user_id", get(recommend_songs))
        .route("/recommend/authors/:user_id", get(recommend_authors))
        .route("/recommend/all/:user_id", get(recommend_all))
        .route("/recommend/author-collab", get(recommend_author_collab))
}

/// Query for GET /recommend/author-collab
#[derive(Debug, Deserialize)]
pub struct CollabQuery {
    /// Comma-separated author ids
    pub seed: String,
}

/// Comma-separated ids, blanks dropped
pub fn parse_seed_list(seed: &str) -> Vec<EntityId> {
    seed.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(EntityId::parse)
        .collect()
}

async fn run_flow(flow: &Flow, seeds: Vec<EntityId>) -> ApiResult<Json<Vec<Entity>>> {
    let started = Instant::now();
    let seed_count = seeds.len();
    let output = flow.evaluate(seeds).await?;
    info!(
        flow = flow.name(),
        seeds = seed_count,
        results = output.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Flow complete"
    );
    Ok(Json(output))
}

/// GET /recommend/songs/:user_id
pub async fn recommend_songs(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Entity>>> {
    run_flow(&state.flows.songs, vec![EntityId::parse(&user_id)]).await
}

/// GET /recommend/authors/:user_id
pub async fn recommend_authors(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Entity>>> {
    run_flow(&state.flows.authors, vec![EntityId::parse(&user_id)]).await
}

/// GET /recommend/all/:user_id
pub async fn recommend_all(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Entity>>> {
    run_flow(&state.flows.recommendations, vec![EntityId::parse(&user_id)]).await
}

/// GET /recommend/author-collab?seed=a,b
pub async fn recommend_author_collab(
    State(state): State<AppState>,
    Query(query): Query<CollabQuery>,
) -> ApiResult<Json<Vec<Entity>>> {
    let seeds = parse_seed_list(&query.seed);
    if seeds.is_empty() {
        return Err(ApiError::BadRequest("seed must name at least one author id".to_string()));
    }
    run_flow(&state.flows.author_collab, seeds).await
}
