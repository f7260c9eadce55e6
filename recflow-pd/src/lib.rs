//! recflow-pd library - program director
//!
//! Binds the flow engine to SQLite and Redis, declares the named flows and
//! serves them over HTTP.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod flows;
pub mod index;
pub mod stores;

use flows::Flows;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub flows: Arc<Flows>,
}

impl AppState {
    pub fn new(flows: Flows) -> Self {
        Self { flows: Arc::new(flows) }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::recommend_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
