//! Recent songs by author (author → songs fan-out)

use crate::entity::{Entity, EntityId};
use crate::error::Result;
use crate::options::{FlowContext, Provider, RecentSongsOptions};
use crate::services::AuthorSongsStore;
use crate::stage::{SharedStage, Stage};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Attribute receiving the author's id
pub const AUTHOR_ID: &str = "author_id";

/// Expands each author entity into its newest songs
pub struct RecentSongs {
    store: Arc<dyn AuthorSongsStore>,
    options: Provider<RecentSongsOptions>,
}

impl RecentSongs {
    pub fn new(store: Arc<dyn AuthorSongsStore>, options: impl Into<Provider<RecentSongsOptions>>) -> Self {
        Self {
            store,
            options: options.into(),
        }
    }
}

#[async_trait]
impl Stage for RecentSongs {
    fn name(&self) -> &str {
        "recent_songs"
    }

    async fn run(&self, input: Vec<Entity>, ctx: &FlowContext) -> Result<Vec<Entity>> {
        if input.is_empty() {
            return Ok(input);
        }

        let options = ctx.resolve(&self.options);
        let mut seen = HashSet::with_capacity(input.len());
        let author_ids: Vec<EntityId> = input
            .iter()
            .map(|e| e.id().clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let songs = match self.store.recent_by_author(&author_ids, &options).await {
            Ok(songs) => songs,
            Err(e) => {
                warn!(authors = author_ids.len(), error = %e, "Author songs lookup failed (no songs)");
                return Ok(Vec::new());
            }
        };

        Ok(input
            .iter()
            .flat_map(|author| {
                songs.get(author.id()).into_iter().flatten().filter_map(move |song| {
                    author
                        .assign(AUTHOR_ID, Some(author.id().to_value()))
                        .map(|e| e.with_id(song.clone()))
                })
            })
            .collect())
    }
}

/// Recent-songs expander over `store`
pub fn recent_songs(
    store: Arc<dyn AuthorSongsStore>,
    options: impl Into<Provider<RecentSongsOptions>>,
) -> SharedStage {
    Arc::new(RecentSongs::new(store, options))
}
