//! # Recflow Common Library
//!
//! Shared code for the recommendation crates:
//! - Error type
//! - Configuration file resolution and TOML bootstrap config
//! - SQLite schema, models and query wrappers
//! - Demo data seeding

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
