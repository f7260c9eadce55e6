//! Stage configuration and configuration providers
//!
//! A stage's options are either a fixed value or a thunk producing a fresh
//! value (e.g. a signal time window relative to "now"). Stages resolve
//! providers through the [`FlowContext`] of the current flow invocation, so a
//! thunk runs once per invocation no matter how many branches share it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Default neighbors per id for similarity lookups
pub const DEFAULT_FAN_OUT: usize = 10;

/// Value-or-thunk configuration source
pub enum Provider<T> {
    Value(T),
    Thunk(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> Provider<T> {
    /// Wrap a function re-evaluated on every stage invocation
    pub fn from_fn(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Provider::Thunk(Arc::new(f))
    }

    /// Current configuration value
    pub fn resolve(&self) -> T {
        match self {
            Provider::Value(value) => value.clone(),
            Provider::Thunk(f) => f(),
        }
    }
}

impl<T: Clone> Clone for Provider<T> {
    fn clone(&self) -> Self {
        match self {
            Provider::Value(value) => Provider::Value(value.clone()),
            Provider::Thunk(f) => Provider::Thunk(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Provider::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

impl<T> From<T> for Provider<T> {
    fn from(value: T) -> Self {
        Provider::Value(value)
    }
}

/// State scoped to one flow invocation
///
/// Thunk providers are memoized by identity: clones of one provider share a
/// single evaluation per context.
#[derive(Default)]
pub struct FlowContext {
    resolved: Mutex<HashMap<usize, Arc<dyn Any + Send + Sync>>>,
}

impl FlowContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider value for this invocation
    pub fn resolve<T>(&self, provider: &Provider<T>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        let Provider::Thunk(f) = provider else {
            return provider.resolve();
        };
        let key = Arc::as_ptr(f) as *const () as usize;

        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = resolved.get(&key).and_then(|v| v.downcast_ref::<T>()) {
            return value.clone();
        }
        let value = provider.resolve();
        resolved.insert(key, Arc::new(value.clone()));
        value
    }
}

impl fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = self.resolved.lock().map(|r| r.len()).unwrap_or_default();
        f.debug_struct("FlowContext").field("resolved", &resolved).finish()
    }
}

/// Similarity lookup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityOptions {
    /// Neighbor graph to query (keys are namespaced by this name)
    #[serde(default)]
    pub index_name: String,

    /// Maximum neighbors returned per id
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
}

fn default_fan_out() -> usize {
    DEFAULT_FAN_OUT
}

impl SimilarityOptions {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            fan_out: DEFAULT_FAN_OUT,
        }
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }
}

/// Signal (recent interaction) query filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalOptions {
    /// Only interactions at or after this instant
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,

    /// Maximum ids returned per user
    #[serde(default)]
    pub limit: Option<u32>,
}

impl SignalOptions {
    /// Provider computing `since = now - window` on every invocation
    pub fn rolling_window(window: Duration, limit: Option<u32>) -> Provider<SignalOptions> {
        Provider::from_fn(move || SignalOptions {
            since: Some(Utc::now() - window),
            limit,
        })
    }
}

/// Recent songs by author configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSongsOptions {
    /// Songs kept per author (newest first); `None` keeps all
    #[serde(default)]
    pub fan_out: Option<usize>,
}
