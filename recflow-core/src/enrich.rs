//! Catalog enrichment
//!
//! Joins entities against song or author catalog records by id with a
//! single batch fetch per invocation. Matched record fields are merged on
//! top of the entity; unmatched entities pass through unchanged.

use crate::entity::{Entity, EntityId};
use crate::error::Result;
use crate::options::FlowContext;
use crate::services::CatalogStore;
use crate::stage::{SharedStage, Stage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Which catalog table to join against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Songs,
    Authors,
}

/// Merge each entity with its matching record (record fields win)
pub fn enrich_with(input: Vec<Entity>, records: Vec<Entity>) -> Vec<Entity> {
    let by_id: HashMap<EntityId, Entity> = records
        .into_iter()
        .map(|record| (record.id().clone(), record))
        .collect();

    input
        .into_iter()
        .map(|entity| match by_id.get(entity.id()) {
            Some(record) => entity.merge(record),
            None => entity,
        })
        .collect()
}

/// Enricher stage
pub struct Enrich {
    kind: CatalogKind,
    catalog: Arc<dyn CatalogStore>,
}

impl Enrich {
    pub fn new(kind: CatalogKind, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { kind, catalog }
    }
}

#[async_trait]
impl Stage for Enrich {
    fn name(&self) -> &str {
        match self.kind {
            CatalogKind::Songs => "enrich_song",
            CatalogKind::Authors => "enrich_author",
        }
    }

    async fn run(&self, input: Vec<Entity>, _ctx: &FlowContext) -> Result<Vec<Entity>> {
        if input.is_empty() {
            return Ok(input);
        }

        let mut seen = HashSet::with_capacity(input.len());
        let ids: Vec<EntityId> = input
            .iter()
            .map(|e| e.id().clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let fetched = match self.kind {
            CatalogKind::Songs => self.catalog.enrich_song_data(&ids).await,
            CatalogKind::Authors => self.catalog.enrich_author_data(&ids).await,
        };

        match fetched {
            Ok(records) => {
                debug!(stage = self.name(), ids = ids.len(), matched = records.len(), "Catalog fetch complete");
                Ok(enrich_with(input, records))
            }
            Err(e) => {
                warn!(stage = self.name(), error = %e, "Catalog fetch failed (entities left unenriched)");
                Ok(input)
            }
        }
    }
}

/// Enrich with song metadata (name, length, genre, author)
pub fn songs(catalog: Arc<dyn CatalogStore>) -> SharedStage {
    Arc::new(Enrich::new(CatalogKind::Songs, catalog))
}

/// Enrich with author metadata (name)
pub fn authors(catalog: Arc<dyn CatalogStore>) -> SharedStage {
    Arc::new(Enrich::new(CatalogKind::Authors, catalog))
}
