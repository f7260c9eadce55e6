//! SQLite-backed collaborators
//!
//! Adapts the `recflow_common::db` query wrappers to the core store traits.
//! Song and user ids are integers; author ids are stored as text and come
//! back keyed by the caller's own [`EntityId`] so lookups line up with the
//! entities that asked for them.

use anyhow::Result;
use async_trait::async_trait;
use recflow_common::db::models::{Author, InteractionKind, Song};
use recflow_common::db::{author_songs, catalog, signals};
use recflow_core::options::{RecentSongsOptions, SignalOptions};
use recflow_core::services::{AuthorSongsStore, CatalogStore, SignalStore};
use recflow_core::{Entity, EntityId};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Signal, catalog and author-songs store over one connection pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn song_ids(
        &self,
        kind: InteractionKind,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>> {
        let Some(user_id) = user_id.as_int() else {
            return Ok(Vec::new());
        };

        let ids = signals::recent_song_ids(
            &self.pool,
            kind,
            user_id,
            options.since.map(|t| t.timestamp()),
            options.limit,
        )
        .await?;
        Ok(ids.into_iter().map(EntityId::Int).collect())
    }

    async fn author_ids(
        &self,
        kind: InteractionKind,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>> {
        let Some(user_id) = user_id.as_int() else {
            return Ok(Vec::new());
        };

        let ids = signals::recent_author_ids(
            &self.pool,
            kind,
            user_id,
            options.since.map(|t| t.timestamp()),
            options.limit,
        )
        .await?;
        Ok(ids.iter().map(|id| EntityId::parse(id)).collect())
    }
}

/// Requested ids keyed by their text form
fn text_keys(ids: &[EntityId]) -> HashMap<String, EntityId> {
    ids.iter().map(|id| (id.to_string(), id.clone())).collect()
}

pub fn song_entity(song: Song) -> Entity {
    Entity::new(song.id)
        .with_attr("name", song.name)
        .with_attr("length", song.length)
        .with_attr("genre", song.genre)
        .with_attr(
            "author_id",
            song.author_id.as_deref().map(|id| EntityId::parse(id).to_value()),
        )
}

pub fn author_entity(id: EntityId, author: Author) -> Entity {
    Entity::new(id).with_attr("name", author.name)
}

#[async_trait]
impl SignalStore for SqliteStore {
    async fn recent_liked_ids(&self, user_id: &EntityId, options: &SignalOptions) -> Result<Vec<EntityId>> {
        self.song_ids(InteractionKind::Liked, user_id, options).await
    }

    async fn recent_saved_ids(&self, user_id: &EntityId, options: &SignalOptions) -> Result<Vec<EntityId>> {
        self.song_ids(InteractionKind::Saved, user_id, options).await
    }

    async fn recent_liked_author_ids(
        &self,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>> {
        self.author_ids(InteractionKind::Liked, user_id, options).await
    }

    async fn recent_saved_author_ids(
        &self,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>> {
        self.author_ids(InteractionKind::Saved, user_id, options).await
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn enrich_song_data(&self, ids: &[EntityId]) -> Result<Vec<Entity>> {
        let song_ids: Vec<i64> = ids.iter().filter_map(EntityId::as_int).collect();
        let songs = catalog::load_songs(&self.pool, &song_ids).await?;
        Ok(songs.into_iter().map(song_entity).collect())
    }

    async fn enrich_author_data(&self, ids: &[EntityId]) -> Result<Vec<Entity>> {
        let requested = text_keys(ids);
        let keys: Vec<String> = requested.keys().cloned().collect();
        let authors = catalog::load_authors(&self.pool, &keys).await?;

        Ok(authors
            .into_iter()
            .filter_map(|author| {
                let id = requested.get(&author.id)?.clone();
                Some(author_entity(id, author))
            })
            .collect())
    }
}

#[async_trait]
impl AuthorSongsStore for SqliteStore {
    async fn recent_by_author(
        &self,
        author_ids: &[EntityId],
        options: &RecentSongsOptions,
    ) -> Result<HashMap<EntityId, Vec<EntityId>>> {
        let requested = text_keys(author_ids);
        let keys: Vec<String> = requested.keys().cloned().collect();
        let songs = author_songs::recent_songs_by_author(&self.pool, &keys, options.fan_out).await?;

        Ok(songs
            .into_iter()
            .filter_map(|(author, songs)| {
                let id = requested.get(&author)?.clone();
                Some((id, songs.into_iter().map(EntityId::Int).collect()))
            })
            .collect())
    }
}
