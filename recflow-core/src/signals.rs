//! Signal extraction (user → recently interacted ids)
//!
//! Turns a per-parent lookup `f(id) -> Option<Vec<child id>>` into a fan-out
//! stage. Each child becomes `{ id: child, user: parent.id, ..parent }`:
//! the parent's identity survives under `user` while the rest of its
//! attributes are copied down.

use crate::entity::{Entity, EntityId};
use crate::error::Result;
use crate::options::{FlowContext, Provider, SignalOptions};
use crate::services::SignalStore;
use crate::stage::{SharedStage, Stage};
use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// Attribute receiving the parent's id
pub const USER: &str = "user";

/// Run `f` for every input entity concurrently and fan the results out.
///
/// A parent whose lookup returns `None`, an empty list, or an error
/// contributes nothing; its siblings are unaffected. Output blocks follow
/// input order.
pub async fn extract_signals<F, Fut>(input: Vec<Entity>, f: F) -> Vec<Entity>
where
    F: Fn(EntityId) -> Fut,
    Fut: Future<Output = anyhow::Result<Option<Vec<EntityId>>>>,
{
    let lookups = input.into_iter().map(|parent| {
        let lookup = f(parent.id().clone());
        async move {
            match lookup.await {
                Ok(Some(children)) => Some((parent, children)),
                Ok(None) => None,
                Err(e) => {
                    warn!(parent = %parent.id(), error = %e, "Signal lookup failed (parent skipped)");
                    None
                }
            }
        }
    });

    join_all(lookups)
        .await
        .into_iter()
        .flatten()
        .flat_map(|(parent, children)| {
            children
                .into_iter()
                .map(move |child| child_of(&parent, child))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// `{ id: child, user: parent.id, ..parent }`, with the parent's own
/// attributes (including an existing `user`) taking precedence over the
/// injected `user`.
fn child_of(parent: &Entity, child: EntityId) -> Entity {
    let mut entity = Entity::new(child).with_attr(USER, parent.id().to_value());
    for (key, value) in parent.attrs() {
        entity = entity.with_attr(key, value.clone());
    }
    entity
}

/// Which interaction a signal stage reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    LikedSongs,
    SavedSongs,
    LikedAuthors,
    SavedAuthors,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::LikedSongs => "liked",
            SignalKind::SavedSongs => "saved",
            SignalKind::LikedAuthors => "liked_authors",
            SignalKind::SavedAuthors => "saved_authors",
        }
    }

    async fn fetch(
        self,
        store: &dyn SignalStore,
        user_id: &EntityId,
        options: &SignalOptions,
    ) -> anyhow::Result<Vec<EntityId>> {
        match self {
            SignalKind::LikedSongs => store.recent_liked_ids(user_id, options).await,
            SignalKind::SavedSongs => store.recent_saved_ids(user_id, options).await,
            SignalKind::LikedAuthors => store.recent_liked_author_ids(user_id, options).await,
            SignalKind::SavedAuthors => store.recent_saved_author_ids(user_id, options).await,
        }
    }
}

/// Fan-out stage reading one kind of signal from a [`SignalStore`]
pub struct SignalStage {
    kind: SignalKind,
    store: Arc<dyn SignalStore>,
    options: Provider<SignalOptions>,
}

impl SignalStage {
    pub fn new(
        kind: SignalKind,
        store: Arc<dyn SignalStore>,
        options: impl Into<Provider<SignalOptions>>,
    ) -> Self {
        Self {
            kind,
            store,
            options: options.into(),
        }
    }
}

#[async_trait]
impl Stage for SignalStage {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn run(&self, input: Vec<Entity>, ctx: &FlowContext) -> Result<Vec<Entity>> {
        let options = ctx.resolve(&self.options);
        let options = &options;
        let store = self.store.as_ref();
        let kind = self.kind;

        Ok(extract_signals(input, |user_id| async move {
            kind.fetch(store, &user_id, options).await.map(Some)
        })
        .await)
    }
}

/// Boxed per-parent lookup
pub type LookupFn =
    Arc<dyn Fn(EntityId) -> BoxFuture<'static, anyhow::Result<Option<Vec<EntityId>>>> + Send + Sync>;

/// Signal extractor over an arbitrary lookup function
pub struct SignalExtractor {
    name: String,
    lookup: LookupFn,
}

impl SignalExtractor {
    pub fn new(name: impl Into<String>, lookup: LookupFn) -> Self {
        Self {
            name: name.into(),
            lookup,
        }
    }
}

#[async_trait]
impl Stage for SignalExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: Vec<Entity>, _ctx: &FlowContext) -> Result<Vec<Entity>> {
        let lookup = Arc::clone(&self.lookup);
        Ok(extract_signals(input, move |id| lookup(id)).await)
    }
}

/// Recently liked songs per user
pub fn liked(store: Arc<dyn SignalStore>, options: impl Into<Provider<SignalOptions>>) -> SharedStage {
    Arc::new(SignalStage::new(SignalKind::LikedSongs, store, options))
}

/// Recently saved songs per user
pub fn saved(store: Arc<dyn SignalStore>, options: impl Into<Provider<SignalOptions>>) -> SharedStage {
    Arc::new(SignalStage::new(SignalKind::SavedSongs, store, options))
}

/// Authors of recently liked songs per user
pub fn liked_authors(
    store: Arc<dyn SignalStore>,
    options: impl Into<Provider<SignalOptions>>,
) -> SharedStage {
    Arc::new(SignalStage::new(SignalKind::LikedAuthors, store, options))
}

/// Authors of recently saved songs per user
pub fn saved_authors(
    store: Arc<dyn SignalStore>,
    options: impl Into<Provider<SignalOptions>>,
) -> SharedStage {
    Arc::new(SignalStage::new(SignalKind::SavedAuthors, store, options))
}

/// Parent id recorded on a fanned-out entity, if any
pub fn parent_of(entity: &Entity) -> Option<Value> {
    entity.get(USER)
}
