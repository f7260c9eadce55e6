//! HTTP endpoint tests against in-memory collaborators
//!
//! Tests cover:
//! - Health endpoint
//! - Per-user flow endpoints
//! - Author-collab seed parsing and validation
//! - Configuration errors surfacing as JSON error bodies

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use recflow_common::config::TomlConfig;
use recflow_core::memory::{MemoryAuthorSongs, MemoryCatalog, MemorySignalStore, MemorySimilarityIndex};
use recflow_core::Entity;
use recflow_pd::flows::{Collaborators, Flows};
use recflow_pd::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

fn collaborators() -> Collaborators {
    let signals = MemorySignalStore::default()
        .with_liked(10000, vec![20000])
        .with_song_author(20000, 30000);
    let index = MemorySimilarityIndex::default()
        .with_neighbors("songs_collab_v1", 20000, vec![20001])
        .with_neighbors("artist:collab:nn:full:big", 30000, vec![30001]);
    let catalog = MemoryCatalog::default()
        .with_song(Entity::new(20001).with_attr("name", "The Sound Of Silence").with_attr("length", 246))
        .with_author(Entity::new(30000).with_attr("name", "Disturbed"))
        .with_author(Entity::new(30001).with_attr("name", "Metallica"));

    Collaborators {
        signals: Arc::new(signals),
        index: Arc::new(index),
        catalog: Arc::new(catalog),
        author_songs: Arc::new(MemoryAuthorSongs::default()),
    }
}

fn setup_app(config: &TomlConfig) -> axum::Router {
    build_router(AppState::new(Flows::build(&collaborators(), config)))
}

fn test_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(&TomlConfig::default());
    let response = app.oneshot(test_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "recflow-pd");
}

#[tokio::test]
async fn test_song_recommendations_for_user() {
    let app = setup_app(&TomlConfig::default());
    let response = app.oneshot(test_request("/recommend/songs/10000")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body,
        json!([{"id": 20001, "user": 10000, "recommender": 20000, "flow": "song"}])
    );
}

#[tokio::test]
async fn test_all_recommendations_are_enriched() {
    let app = setup_app(&TomlConfig::default());
    let response = app.oneshot(test_request("/recommend/all/10000")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body[0]["id"], 20001);
    assert_eq!(body[0]["name"], "The Sound Of Silence");
}

#[tokio::test]
async fn test_unknown_user_gets_empty_list() {
    let app = setup_app(&TomlConfig::default());
    let response = app.oneshot(test_request("/recommend/authors/424242")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!([]));
}

#[tokio::test]
async fn test_author_collab_endpoint() {
    let app = setup_app(&TomlConfig::default());
    let response = app
        .oneshot(test_request("/recommend/author-collab?seed=30000,unknown"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body,
        json!([{
            "id": 30001,
            "recommender": 30000,
            "recommender_name": "Disturbed",
            "name": "Metallica",
            "index": "full"
        }])
    );
}

#[tokio::test]
async fn test_author_collab_requires_seed() {
    let app = setup_app(&TomlConfig::default());
    let response = app
        .oneshot(test_request("/recommend/author-collab?seed=,"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_missing_index_name_is_server_error() {
    let mut config = TomlConfig::default();
    config.songs.similarity.index_name = String::new();
    let app = setup_app(&config);

    let response = app.oneshot(test_request("/recommend/songs/10000")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CONFIG_ERROR");
}
