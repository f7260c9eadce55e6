//! Collaborator store contracts
//!
//! Implementations must be safe for concurrent use by many in-flight
//! lookups (`Send + Sync`, no external locking). Absence of data is an
//! empty result, never an error.

use crate::entity::{Entity, EntityId};
use crate::options::{RecentSongsOptions, SignalOptions, SimilarityOptions};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use tracing::warn;

/// Recorded user interactions (likes, saves)
///
/// Every method returns ids most-recent-first and an empty list when the
/// user has no matching activity.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn recent_liked_ids(&self, user_id: &EntityId, options: &SignalOptions) -> Result<Vec<EntityId>>;

    async fn recent_saved_ids(&self, user_id: &EntityId, options: &SignalOptions) -> Result<Vec<EntityId>>;

    async fn recent_liked_author_ids(
        &self,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>>;

    async fn recent_saved_author_ids(
        &self,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>>;
}

/// Precomputed nearest-neighbor graphs, namespaced by index name
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Neighbors of a single id, at most `fan_out` of them
    async fn neighbors(&self, index_name: &str, id: &EntityId, fan_out: usize) -> Result<Vec<EntityId>>;

    /// Neighbors for a batch of ids, looked up concurrently.
    ///
    /// Ids with no neighbors are omitted from the map. A failed lookup for
    /// one id is logged and treated as "no neighbors"; it never fails the
    /// batch.
    async fn get_similar(
        &self,
        ids: &[EntityId],
        options: &SimilarityOptions,
    ) -> Result<HashMap<EntityId, Vec<EntityId>>> {
        let lookups = ids.iter().map(|id| async move {
            match self.neighbors(&options.index_name, id, options.fan_out).await {
                Ok(similar) if !similar.is_empty() => Some((id.clone(), similar)),
                Ok(_) => None,
                Err(e) => {
                    warn!(
                        index = %options.index_name,
                        id = %id,
                        error = %e,
                        "Similarity lookup failed (treated as no neighbors)"
                    );
                    None
                }
            }
        });

        Ok(join_all(lookups).await.into_iter().flatten().collect())
    }
}

/// Descriptive catalog data keyed by id
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn enrich_song_data(&self, ids: &[EntityId]) -> Result<Vec<Entity>>;

    async fn enrich_author_data(&self, ids: &[EntityId]) -> Result<Vec<Entity>>;
}

/// Songs published by authors
#[async_trait]
pub trait AuthorSongsStore: Send + Sync {
    /// Song ids per author, newest first, capped at `options.fan_out` when set.
    /// Authors without songs are omitted.
    async fn recent_by_author(
        &self,
        author_ids: &[EntityId],
        options: &RecentSongsOptions,
    ) -> Result<HashMap<EntityId, Vec<EntityId>>>;
}
