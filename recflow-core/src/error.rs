//! Error types for flow evaluation
//!
//! Absence of data is never an error: stages return empty lists instead.
//! Per-parent and per-branch failures are swallowed at the fan-out/fan-in
//! point. Only structural failures (misconfigured flows) reach the caller.

use thiserror::Error;

/// Result type for stage and flow evaluation
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while evaluating a stage
#[derive(Error, Debug)]
pub enum Error {
    /// Flow was constructed with missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A collaborator store failed (wraps the store's error)
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] anyhow::Error),

    /// A stage failed for a reason of its own
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}

impl Error {
    /// Create a stage failure
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// True for programming errors in flow construction.
    ///
    /// Structural errors always propagate to the flow caller, even through
    /// `merge` branches.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
