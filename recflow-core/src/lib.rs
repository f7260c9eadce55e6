//! # Recflow Core
//!
//! The entity flow combinator used by every recommendation flow:
//! - Entities (immutable attribute maps keyed by `id`)
//! - The `Stage` contract and sequential `Flow` composition
//! - Fan-out stages (signals, similarity, recent songs by author)
//! - Catalog enrichment
//! - List combinators (`set`, `set_val`, `take`, `dedupe`, `diversify`, `sort`, `merge`)
//!
//! Collaborator stores are consumed through the traits in [`services`]; the
//! [`memory`] module provides in-memory implementations for tests and demos.

pub mod author_songs;
pub mod combinators;
pub mod enrich;
pub mod entity;
pub mod error;
pub mod flow;
pub mod memory;
pub mod options;
pub mod services;
pub mod signals;
pub mod similarity;
pub mod stage;

pub use entity::{as_list, Entity, EntityId, StageInput};
pub use error::{Error, Result};
pub use flow::{merge_branches, Flow};
pub use options::{FlowContext, Provider, RecentSongsOptions, SignalOptions, SimilarityOptions};
pub use stage::{SharedStage, Stage};
