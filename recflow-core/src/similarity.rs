//! Similarity expansion (id → nearest neighbors)
//!
//! Every input entity is replaced by one copy per neighbor, with `id`
//! overwritten and all other attributes kept. Attributes set earlier in the
//! flow (e.g. `recommender`) therefore survive expansion.

use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};
use crate::options::{FlowContext, Provider, SimilarityOptions};
use crate::services::SimilarityIndex;
use crate::stage::{SharedStage, Stage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Similarity expander stage
pub struct Similar {
    index: Arc<dyn SimilarityIndex>,
    options: Provider<SimilarityOptions>,
}

impl Similar {
    pub fn new(index: Arc<dyn SimilarityIndex>, options: impl Into<Provider<SimilarityOptions>>) -> Self {
        Self {
            index,
            options: options.into(),
        }
    }
}

/// Distinct ids in first-seen order
fn distinct_ids(input: &[Entity]) -> Vec<EntityId> {
    let mut seen = HashSet::with_capacity(input.len());
    input
        .iter()
        .map(|e| e.id().clone())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Replace each entity by its neighbors; entities without neighbors vanish
pub fn expand(input: Vec<Entity>, similar: &HashMap<EntityId, Vec<EntityId>>) -> Vec<Entity> {
    input
        .iter()
        .flat_map(|entity| {
            similar
                .get(entity.id())
                .into_iter()
                .flatten()
                .map(move |neighbor| entity.with_id(neighbor.clone()))
        })
        .collect()
}

#[async_trait]
impl Stage for Similar {
    fn name(&self) -> &str {
        "similar"
    }

    async fn run(&self, input: Vec<Entity>, ctx: &FlowContext) -> Result<Vec<Entity>> {
        let options = ctx.resolve(&self.options);
        if options.index_name.trim().is_empty() {
            return Err(Error::Config(
                "similarity stage requires a non-empty index_name".to_string(),
            ));
        }

        if input.is_empty() {
            return Ok(input);
        }

        let ids = distinct_ids(&input);
        let similar = match self.index.get_similar(&ids, &options).await {
            Ok(similar) => similar,
            Err(e) => {
                warn!(
                    index = %options.index_name,
                    ids = ids.len(),
                    error = %e,
                    "Similarity batch failed (no neighbors)"
                );
                HashMap::new()
            }
        };

        debug!(
            index = %options.index_name,
            fan_out = options.fan_out,
            ids = ids.len(),
            matched = similar.len(),
            "Similarity lookup complete"
        );

        Ok(expand(input, &similar))
    }
}

/// Similarity expander over `index`
pub fn similar(
    index: Arc<dyn SimilarityIndex>,
    options: impl Into<Provider<SimilarityOptions>>,
) -> SharedStage {
    Arc::new(Similar::new(index, options))
}
