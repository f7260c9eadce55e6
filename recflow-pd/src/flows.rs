//! Named recommendation flows
//!
//! - **song**: user → liked + saved songs → similar songs
//! - **author**: user → liked + saved authors → similar authors → their newest songs
//! - **recommendations**: song + author flows, enriched and sorted by length
//! - **author collab**: seed authors → similar authors across three indexes
//!
//! The song and author flows take the signal window as a provider. Flows
//! built from one provider see the same window within an evaluation.

use crate::config::{recent_songs_options, signal_options, similarity_options};
use recflow_common::config::{SimilarityTable, TomlConfig};
use recflow_core::combinators::{dedupe, diversify, set, set_val, sort, take};
use recflow_core::services::{AuthorSongsStore, CatalogStore, SignalStore, SimilarityIndex};
use recflow_core::{
    author_songs, enrich, merge_branches, signals, similarity, Flow, Provider, SharedStage, SignalOptions,
};
use std::sync::Arc;

/// Stores the flows read from
#[derive(Clone)]
pub struct Collaborators {
    pub signals: Arc<dyn SignalStore>,
    pub index: Arc<dyn SimilarityIndex>,
    pub catalog: Arc<dyn CatalogStore>,
    pub author_songs: Arc<dyn AuthorSongsStore>,
}

pub fn song_flow(stores: &Collaborators, config: &TomlConfig, window: &Provider<SignalOptions>) -> Flow {
    Flow::pipe(
        "song",
        [
            merge_branches([
                signals::liked(stores.signals.clone(), window.clone()),
                signals::saved(stores.signals.clone(), window.clone()),
            ]),
            dedupe("id"),
            set("id", "recommender"),
            set_val("flow", "song"),
            similarity::similar(stores.index.clone(), similarity_options(&config.songs.similarity)),
            dedupe("id"),
            diversify("recommender"),
            take(config.songs.take),
        ],
    )
}

pub fn author_flow(stores: &Collaborators, config: &TomlConfig, window: &Provider<SignalOptions>) -> Flow {
    Flow::pipe(
        "author",
        [
            merge_branches([
                signals::liked_authors(stores.signals.clone(), window.clone()),
                signals::saved_authors(stores.signals.clone(), window.clone()),
            ]),
            dedupe("id"),
            set("id", "recommender"),
            set_val("flow", "author"),
            similarity::similar(stores.index.clone(), similarity_options(&config.authors.similarity)),
            dedupe("id"),
            author_songs::recent_songs(
                stores.author_songs.clone(),
                recent_songs_options(config.authors.songs_per_author),
            ),
            diversify("recommender"),
            take(config.authors.take),
        ],
    )
}

pub fn recommendations_flow(
    stores: &Collaborators,
    config: &TomlConfig,
    window: &Provider<SignalOptions>,
) -> Flow {
    Flow::pipe(
        "recommendations",
        [
            merge_branches([
                song_flow(stores, config, window).shared(),
                author_flow(stores, config, window).shared(),
            ]),
            dedupe("id"),
            enrich::songs(stores.catalog.clone()),
            sort("length"),
        ],
    )
}

/// Similarity branch tagging its output with the branch name
fn tagged_similar(stores: &Collaborators, branch: &str, table: &SimilarityTable) -> SharedStage {
    Flow::pipe(
        branch,
        [
            set_val("index", branch),
            similarity::similar(stores.index.clone(), similarity_options(table)),
        ],
    )
    .shared()
}

pub fn author_collab_flow(stores: &Collaborators, config: &TomlConfig) -> Flow {
    let collab = &config.author_collab;

    Flow::pipe(
        "author-collab",
        [
            set("id", "recommender"),
            enrich::authors(stores.catalog.clone()),
            set("name", "recommender_name"),
            merge_branches([
                tagged_similar(stores, "negative", &collab.negative),
                tagged_similar(stores, "partial", &collab.partial),
                tagged_similar(stores, "full", &collab.full),
            ]),
            dedupe("id"),
            diversify("recommender"),
            take(collab.take),
            enrich::authors(stores.catalog.clone()),
        ],
    )
}

/// Every named flow, built once at startup
#[derive(Clone)]
pub struct Flows {
    pub songs: Flow,
    pub authors: Flow,
    pub recommendations: Flow,
    pub author_collab: Flow,
}

impl Flows {
    pub fn build(stores: &Collaborators, config: &TomlConfig) -> Self {
        let window = signal_options(&config.signals);
        Self {
            songs: song_flow(stores, config, &window),
            authors: author_flow(stores, config, &window),
            recommendations: recommendations_flow(stores, config, &window),
            author_collab: author_collab_flow(stores, config),
        }
    }
}
