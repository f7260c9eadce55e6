//! In-memory collaborator stores
//!
//! Used by unit and integration tests, and by demos that run flows without
//! SQLite or Redis. Every store can be told to fail for specific ids to
//! exercise partial-failure handling.

use crate::entity::{Entity, EntityId};
use crate::options::{RecentSongsOptions, SignalOptions};
use crate::services::{AuthorSongsStore, CatalogStore, SignalStore, SimilarityIndex};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct Interaction {
    song_id: EntityId,
    event_time: DateTime<Utc>,
}

/// Likes/saves per user, plus the song → author mapping for author signals
#[derive(Debug, Default)]
pub struct MemorySignalStore {
    liked: HashMap<EntityId, Vec<Interaction>>,
    saved: HashMap<EntityId, Vec<Interaction>>,
    song_authors: HashMap<EntityId, EntityId>,
    failing_users: HashSet<EntityId>,
}

impl MemorySignalStore {
    /// Record likes, most recent first (one minute apart, ending now)
    pub fn with_liked<I: Into<EntityId>>(mut self, user: impl Into<EntityId>, songs: Vec<I>) -> Self {
        self.liked.entry(user.into()).or_default().extend(spaced(songs));
        self
    }

    /// Record saves, most recent first (one minute apart, ending now)
    pub fn with_saved<I: Into<EntityId>>(mut self, user: impl Into<EntityId>, songs: Vec<I>) -> Self {
        self.saved.entry(user.into()).or_default().extend(spaced(songs));
        self
    }

    /// Record a like at an explicit instant
    pub fn with_liked_at(
        mut self,
        user: impl Into<EntityId>,
        song: impl Into<EntityId>,
        event_time: DateTime<Utc>,
    ) -> Self {
        let entries = self.liked.entry(user.into()).or_default();
        entries.push(Interaction {
            song_id: song.into(),
            event_time,
        });
        entries.sort_by(|a, b| b.event_time.cmp(&a.event_time));
        self
    }

    pub fn with_song_author(mut self, song: impl Into<EntityId>, author: impl Into<EntityId>) -> Self {
        self.song_authors.insert(song.into(), author.into());
        self
    }

    /// Every lookup for `user` fails
    pub fn failing_for(mut self, user: impl Into<EntityId>) -> Self {
        self.failing_users.insert(user.into());
        self
    }

    fn recent(
        &self,
        table: &HashMap<EntityId, Vec<Interaction>>,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>> {
        if self.failing_users.contains(user_id) {
            bail!("signal store unavailable for user {}", user_id);
        }

        let ids = table
            .get(user_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|i| options.since.map_or(true, |since| i.event_time >= since))
                    .map(|i| i.song_id.clone())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(apply_limit(ids, options.limit.map(|l| l as usize)))
    }

    fn recent_authors(
        &self,
        table: &HashMap<EntityId, Vec<Interaction>>,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>> {
        let unlimited = SignalOptions {
            since: options.since,
            limit: None,
        };
        let mut seen = HashSet::new();
        let authors = self
            .recent(table, user_id, &unlimited)?
            .into_iter()
            .filter_map(|song| self.song_authors.get(&song).cloned())
            .filter(|author| seen.insert(author.clone()))
            .collect();

        Ok(apply_limit(authors, options.limit.map(|l| l as usize)))
    }
}

fn spaced<I: Into<EntityId>>(songs: Vec<I>) -> Vec<Interaction> {
    let now = Utc::now();
    songs
        .into_iter()
        .enumerate()
        .map(|(i, song)| Interaction {
            song_id: song.into(),
            event_time: now - Duration::minutes(i as i64),
        })
        .collect()
}

fn apply_limit(mut ids: Vec<EntityId>, limit: Option<usize>) -> Vec<EntityId> {
    if let Some(limit) = limit {
        ids.truncate(limit);
    }
    ids
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn recent_liked_ids(&self, user_id: &EntityId, options: &SignalOptions) -> Result<Vec<EntityId>> {
        self.recent(&self.liked, user_id, options)
    }

    async fn recent_saved_ids(&self, user_id: &EntityId, options: &SignalOptions) -> Result<Vec<EntityId>> {
        self.recent(&self.saved, user_id, options)
    }

    async fn recent_liked_author_ids(
        &self,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>> {
        self.recent_authors(&self.liked, user_id, options)
    }

    async fn recent_saved_author_ids(
        &self,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> Result<Vec<EntityId>> {
        self.recent_authors(&self.saved, user_id, options)
    }
}

/// Neighbor lists keyed by (index name, id)
#[derive(Debug, Default)]
pub struct MemorySimilarityIndex {
    graphs: HashMap<(String, EntityId), Vec<EntityId>>,
    failing_ids: HashSet<EntityId>,
}

impl MemorySimilarityIndex {
    pub fn with_neighbors<I: Into<EntityId>>(
        mut self,
        index_name: &str,
        id: impl Into<EntityId>,
        neighbors: Vec<I>,
    ) -> Self {
        self.graphs.insert(
            (index_name.to_string(), id.into()),
            neighbors.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Every lookup of `id` fails
    pub fn failing_for(mut self, id: impl Into<EntityId>) -> Self {
        self.failing_ids.insert(id.into());
        self
    }
}

#[async_trait]
impl SimilarityIndex for MemorySimilarityIndex {
    async fn neighbors(&self, index_name: &str, id: &EntityId, fan_out: usize) -> Result<Vec<EntityId>> {
        if self.failing_ids.contains(id) {
            bail!("similarity index unavailable for {}:{}", index_name, id);
        }

        Ok(self
            .graphs
            .get(&(index_name.to_string(), id.clone()))
            .map(|neighbors| neighbors.iter().take(fan_out).cloned().collect())
            .unwrap_or_default())
    }
}

/// Song and author catalog records
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    songs: HashMap<EntityId, Entity>,
    authors: HashMap<EntityId, Entity>,
    unavailable: bool,
    fetches: AtomicUsize,
}

impl MemoryCatalog {
    pub fn with_song(mut self, record: Entity) -> Self {
        self.songs.insert(record.id().clone(), record);
        self
    }

    pub fn with_author(mut self, record: Entity) -> Self {
        self.authors.insert(record.id().clone(), record);
        self
    }

    /// Every fetch fails
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Number of batch fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn fetch(&self, table: &HashMap<EntityId, Entity>, ids: &[EntityId]) -> Result<Vec<Entity>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            bail!("catalog unavailable");
        }
        Ok(ids.iter().filter_map(|id| table.get(id).cloned()).collect())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn enrich_song_data(&self, ids: &[EntityId]) -> Result<Vec<Entity>> {
        self.fetch(&self.songs, ids)
    }

    async fn enrich_author_data(&self, ids: &[EntityId]) -> Result<Vec<Entity>> {
        self.fetch(&self.authors, ids)
    }
}

/// Songs per author, newest first
#[derive(Debug, Default)]
pub struct MemoryAuthorSongs {
    songs: HashMap<EntityId, Vec<EntityId>>,
    unavailable: bool,
}

impl MemoryAuthorSongs {
    pub fn with_songs<I: Into<EntityId>>(mut self, author: impl Into<EntityId>, songs: Vec<I>) -> Self {
        self.songs
            .insert(author.into(), songs.into_iter().map(Into::into).collect());
        self
    }

    /// Every lookup fails
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl AuthorSongsStore for MemoryAuthorSongs {
    async fn recent_by_author(
        &self,
        author_ids: &[EntityId],
        options: &RecentSongsOptions,
    ) -> Result<HashMap<EntityId, Vec<EntityId>>> {
        if self.unavailable {
            bail!("author songs unavailable");
        }

        Ok(author_ids
            .iter()
            .filter_map(|author| {
                let songs = self.songs.get(author)?;
                let songs = apply_limit(songs.clone(), options.fan_out);
                (!songs.is_empty()).then(|| (author.clone(), songs))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_since_filter() {
        let now = Utc::now();
        let store = MemorySignalStore::default()
            .with_liked_at(1, 100, now - Duration::days(5))
            .with_liked_at(1, 101, now - Duration::hours(1));

        let options = SignalOptions {
            since: Some(now - Duration::days(2)),
            limit: None,
        };
        let ids = store.recent_liked_ids(&EntityId::from(1), &options).await.unwrap();
        assert_eq!(ids, vec![EntityId::from(101)]);

        let all = store
            .recent_liked_ids(&EntityId::from(1), &SignalOptions::default())
            .await
            .unwrap();
        assert_eq!(all, vec![EntityId::from(101), EntityId::from(100)]);
    }

    #[tokio::test]
    async fn test_author_signals_deduplicate() {
        let store = MemorySignalStore::default()
            .with_liked(1, vec![100, 101, 102])
            .with_song_author(100, "artist:a")
            .with_song_author(101, "artist:a")
            .with_song_author(102, "artist:b");

        let authors = store
            .recent_liked_author_ids(&EntityId::from(1), &SignalOptions::default())
            .await
            .unwrap();
        assert_eq!(authors, vec![EntityId::from("artist:a"), EntityId::from("artist:b")]);
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_signals() {
        let store = MemorySignalStore::default();
        let ids = store
            .recent_saved_ids(&EntityId::from(42), &SignalOptions::default())
            .await
            .unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_similarity_fan_out_bound() {
        let index = MemorySimilarityIndex::default().with_neighbors("idx", "1", vec!["2", "3", "4"]);
        let neighbors = index.neighbors("idx", &EntityId::from("1"), 2).await.unwrap();
        assert_eq!(neighbors.len(), 2);
        assert!(index.neighbors("other", &EntityId::from("1"), 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_author_songs_cap() {
        let store = MemoryAuthorSongs::default().with_songs("a", vec![1, 2, 3]);
        let options = RecentSongsOptions { fan_out: Some(2) };
        let songs = store
            .recent_by_author(&[EntityId::from("a"), EntityId::from("b")], &options)
            .await
            .unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[&EntityId::from("a")], vec![EntityId::from(1), EntityId::from(2)]);
    }
}
