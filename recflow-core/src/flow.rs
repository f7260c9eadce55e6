//! Flow composition
//!
//! A [`Flow`] is an ordered sequence of stages evaluated one after another,
//! the output list of each stage feeding the next. Flows are stages
//! themselves, so they nest inside other flows and merge branches.
//!
//! # Example
//! ```rust,ignore
//! let recommendations = Flow::pipe("author-collab", [
//!     combinators::set("id", "recommender"),
//!     enrich::authors(catalog.clone()),
//!     merge_branches([negative.shared(), partial.shared(), full.shared()]),
//!     combinators::dedupe("id"),
//!     combinators::take(20),
//! ]);
//! let entities = recommendations.evaluate(vec!["A", "B"]).await?;
//! ```

use crate::combinators::merge;
use crate::entity::{Entity, StageInput};
use crate::error::Result;
use crate::options::FlowContext;
use crate::stage::{SharedStage, Stage};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Sequential composition of stages
#[derive(Clone)]
pub struct Flow {
    name: String,
    stages: Vec<SharedStage>,
}

impl Flow {
    /// Empty flow (identity transform)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Flow equivalent to `sn(...s2(s1(input)))`
    pub fn pipe(name: impl Into<String>, stages: impl IntoIterator<Item = SharedStage>) -> Self {
        Self {
            name: name.into(),
            stages: stages.into_iter().collect(),
        }
    }

    /// Append a stage
    pub fn then(mut self, stage: SharedStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// New flow running this flow's stages followed by `next`'s
    pub fn chain(&self, next: &Flow) -> Flow {
        let mut stages = self.stages.clone();
        stages.extend(next.stages.iter().cloned());
        Flow {
            name: format!("{}+{}", self.name, next.name),
            stages,
        }
    }

    pub fn shared(self) -> SharedStage {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Evaluate the flow against a seed id, a list of ids, an entity or a
    /// list of entities.
    ///
    /// Each call is one invocation: configuration providers are resolved at
    /// most once, however many branches share them.
    pub async fn evaluate(&self, input: impl Into<StageInput>) -> Result<Vec<Entity>> {
        let ctx = FlowContext::new();
        self.run(input.into().into_vec(), &ctx).await
    }
}

#[async_trait]
impl Stage for Flow {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: Vec<Entity>, ctx: &FlowContext) -> Result<Vec<Entity>> {
        let mut entities = input;
        for stage in &self.stages {
            let input_count = entities.len();
            entities = stage.run(entities, ctx).await?;
            debug!(
                flow = %self.name,
                stage = stage.name(),
                input = input_count,
                output = entities.len(),
                "Stage complete"
            );
        }
        Ok(entities)
    }
}

/// Fan the same input into several branches and merge their outputs
pub struct Merge {
    name: String,
    branches: Vec<SharedStage>,
}

impl Merge {
    pub fn new(branches: impl IntoIterator<Item = SharedStage>) -> Self {
        let branches: Vec<SharedStage> = branches.into_iter().collect();
        let name = format!(
            "merge({})",
            branches.iter().map(|b| b.name()).collect::<Vec<_>>().join(",")
        );
        Self { name, branches }
    }
}

#[async_trait]
impl Stage for Merge {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: Vec<Entity>, ctx: &FlowContext) -> Result<Vec<Entity>> {
        merge(self.branches.iter().map(|branch| branch.run(input.clone(), ctx))).await
    }
}

/// Stage running every branch concurrently on the same upstream input.
///
/// Branch outputs are concatenated in declaration order; failed branches are
/// discarded (see [`crate::combinators::collect_successes`]).
pub fn merge_branches(branches: impl IntoIterator<Item = SharedStage>) -> SharedStage {
    Arc::new(Merge::new(branches))
}
