//! Named flows over the SQLite stores (demo data) with an in-memory index

use recflow_common::config::TomlConfig;
use recflow_common::db::init::init_database;
use recflow_common::db::seed::{insert_demo_data, JOE};
use recflow_core::memory::MemorySimilarityIndex;
use recflow_core::options::{RecentSongsOptions, SignalOptions};
use recflow_core::services::{AuthorSongsStore, CatalogStore, SignalStore};
use recflow_core::EntityId;
use recflow_pd::flows::{Collaborators, Flows};
use recflow_pd::stores::SqliteStore;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

async fn demo_store() -> (TempDir, Arc<SqliteStore>) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("recflow.db")).await.unwrap();
    insert_demo_data(&pool).await.unwrap();
    (dir, Arc::new(SqliteStore::new(pool)))
}

#[tokio::test]
async fn test_signal_store_reads_demo_interactions() {
    let (_dir, store) = demo_store().await;
    let joe = EntityId::from(JOE);

    let liked = store.recent_liked_ids(&joe, &SignalOptions::default()).await.unwrap();
    assert_eq!(liked, vec![EntityId::from(20000)]);

    let authors = store.recent_saved_author_ids(&joe, &SignalOptions::default()).await.unwrap();
    assert_eq!(authors, vec![EntityId::from(30001)]);

    let nobody = store
        .recent_liked_ids(&EntityId::from("not-a-user"), &SignalOptions::default())
        .await
        .unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_author_lookups_keyed_by_requested_id() {
    let (_dir, store) = demo_store().await;

    let records = store
        .enrich_author_data(&[EntityId::from("30002"), EntityId::from(30003)])
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .any(|r| r.id() == &EntityId::from("30002") && r.get("name") == Some(json!("Godsmack"))));
    assert!(records
        .iter()
        .any(|r| r.id() == &EntityId::from(30003) && r.get("name") == Some(json!("AC/DC"))));

    let songs = store
        .recent_by_author(&[EntityId::from(30000)], &RecentSongsOptions { fan_out: Some(1) })
        .await
        .unwrap();
    assert_eq!(songs[&EntityId::from(30000)], vec![EntityId::from(20001)]);
}

#[tokio::test]
async fn test_song_records_carry_catalog_fields() {
    let (_dir, store) = demo_store().await;

    let records = store.enrich_song_data(&[EntityId::from(20003)]).await.unwrap();
    assert_eq!(
        serde_json::to_value(&records).unwrap(),
        json!([{
            "id": 20003,
            "name": "Bulletproof",
            "length": 147,
            "genre": "Hard Rock",
            "author_id": 30002
        }])
    );
}

#[tokio::test]
async fn test_recommendations_for_joe() {
    let (_dir, store) = demo_store().await;
    let index = MemorySimilarityIndex::default()
        .with_neighbors("songs_collab_v1", 20000, vec![20003, 20004])
        .with_neighbors("songs_collab_v1", 20002, vec![20004])
        .with_neighbors("authors_collab_v1", 30000, vec![30004]);

    let stores = Collaborators {
        signals: store.clone(),
        index: Arc::new(index),
        catalog: store.clone(),
        author_songs: store,
    };
    let flows = Flows::build(&stores, &TomlConfig::default());

    let output = flows.recommendations.evaluate(JOE).await.unwrap();
    let names: Vec<_> = output.iter().filter_map(|e| e.get("name")).collect();

    // Sorted by length: Bulletproof 147, Thunderstruck 256, Rap God 360
    assert_eq!(names, vec![json!("Bulletproof"), json!("Thunderstruck"), json!("Rap God")]);
    let rap_god = &output[2];
    assert_eq!(rap_god.get("flow"), Some(json!("author")));
    assert_eq!(rap_god.get("recommender"), Some(json!(30000)));
}
