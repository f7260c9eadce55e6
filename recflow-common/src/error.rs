//! Errors raised by the storage and configuration layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure preparing the database directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or malformed TOML bootstrap file
    #[error("Configuration error: {0}")]
    Config(String),
}
