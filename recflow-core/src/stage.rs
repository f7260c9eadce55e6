//! Stage contract
//!
//! A stage is a named async transform from a list of entities to a list of
//! entities. Scalar seeds are normalized to lists once, at the flow boundary
//! (see [`crate::entity::as_list`]), so stages only ever see lists.

use crate::entity::Entity;
use crate::error::Result;
use crate::options::FlowContext;
use async_trait::async_trait;
use std::sync::Arc;

/// Composable async list-to-list transform
///
/// Stages must not fail for normal absence of data: an id without
/// neighbors or a user without signals contributes zero entities.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage identifier for logging
    fn name(&self) -> &str;

    /// Transform the input list.
    ///
    /// `ctx` belongs to the enclosing flow invocation; configuration
    /// providers are resolved through it.
    async fn run(&self, input: Vec<Entity>, ctx: &FlowContext) -> Result<Vec<Entity>>;
}

/// Reference-counted stage, shareable across flows and merge branches
pub type SharedStage = Arc<dyn Stage>;

/// Stage backed by a synchronous list function
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F> FnStage<F>
where
    F: Fn(Vec<Entity>) -> Vec<Entity> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    pub fn shared(name: impl Into<String>, f: F) -> SharedStage {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(Vec<Entity>) -> Vec<Entity> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: Vec<Entity>, _ctx: &FlowContext) -> Result<Vec<Entity>> {
        Ok((self.f)(input))
    }
}
