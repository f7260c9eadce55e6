//! Database schema, models and queries

pub mod author_songs;
pub mod catalog;
pub mod init;
pub mod models;
pub mod seed;
pub mod signals;

pub use init::*;
pub use models::*;

/// `?, ?, ?` for an `IN (...)` clause of `n` bound parameters
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
