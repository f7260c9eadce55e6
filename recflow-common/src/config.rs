//! Configuration loading and config file resolution
//!
//! Bootstrap configuration lives in a single TOML file. The file is located
//! in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `RECFLOW_CONFIG` environment variable
//! 3. `~/.config/recflow/config.toml`
//! 4. `/etc/recflow/config.toml`
//!
//! A missing file is not an error: compiled defaults are used, and the caller
//! reports which source was chosen once logging is up.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RECFLOW_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Redis connection URL for the similarity index
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address for `serve`
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub signals: SignalsConfig,

    #[serde(default = "default_songs")]
    pub songs: SongsConfig,

    #[serde(default = "default_authors")]
    pub authors: AuthorsConfig,

    #[serde(default = "default_author_collab")]
    pub author_collab: AuthorCollabConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Rolling time window for user signals
#[derive(Debug, Clone, Deserialize)]
pub struct SignalsConfig {
    #[serde(default = "default_window_days")]
    pub window_days: i64,

    #[serde(default = "default_signal_limit")]
    pub limit: Option<u32>,
}

/// One similarity index reference. An empty `index_name` is accepted here
/// and rejected when the similarity stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimilarityTable {
    #[serde(default)]
    pub index_name: String,

    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SongsConfig {
    #[serde(flatten)]
    pub similarity: SimilarityTable,

    #[serde(default = "default_take")]
    pub take: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorsConfig {
    #[serde(flatten)]
    pub similarity: SimilarityTable,

    #[serde(default = "default_take")]
    pub take: usize,

    /// Newest songs kept per recommended author
    #[serde(default = "default_songs_per_author")]
    pub songs_per_author: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorCollabConfig {
    pub negative: SimilarityTable,
    pub partial: SimilarityTable,
    pub full: SimilarityTable,

    #[serde(default = "default_collab_take")]
    pub take: usize,
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("recflow").join("recflow.db"))
        .unwrap_or_else(|| PathBuf::from("./recflow_data/recflow.db"))
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:5740".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_window_days() -> i64 {
    2
}

fn default_signal_limit() -> Option<u32> {
    Some(50)
}

fn default_fan_out() -> usize {
    10
}

fn default_take() -> usize {
    5
}

fn default_collab_take() -> usize {
    20
}

fn default_songs_per_author() -> Option<usize> {
    Some(2)
}

fn table(index_name: &str, fan_out: usize) -> SimilarityTable {
    SimilarityTable {
        index_name: index_name.to_string(),
        fan_out,
    }
}

fn default_songs() -> SongsConfig {
    SongsConfig {
        similarity: table("songs_collab_v1", 5),
        take: default_take(),
    }
}

fn default_authors() -> AuthorsConfig {
    AuthorsConfig {
        similarity: table("authors_collab_v1", 3),
        take: default_take(),
        songs_per_author: default_songs_per_author(),
    }
}

fn default_author_collab() -> AuthorCollabConfig {
    AuthorCollabConfig {
        negative: table("artist:collab:nn:less_negatives:small", 20),
        partial: table("artist:collab:nn:partial:small", 20),
        full: table("artist:collab:nn:full:big", 20),
        take: default_collab_take(),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            limit: default_signal_limit(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            redis_url: default_redis_url(),
            bind: default_bind(),
            logging: LoggingConfig::default(),
            signals: SignalsConfig::default(),
            songs: default_songs(),
            authors: default_authors(),
            author_collab: default_author_collab(),
        }
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    /// Load the resolved config file, or compiled defaults when none exists.
    ///
    /// Returns the path the configuration came from, if any. An explicitly
    /// named file (CLI or env) that fails to load is an error.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_config_path(cli_arg) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }
}

/// Locate the config file following the documented priority order
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("recflow").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/recflow/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_indexes() {
        let config = TomlConfig::default();
        assert_eq!(config.songs.similarity.index_name, "songs_collab_v1");
        assert_eq!(config.songs.similarity.fan_out, 5);
        assert_eq!(config.authors.similarity.fan_out, 3);
        assert_eq!(config.authors.songs_per_author, Some(2));
        assert_eq!(config.author_collab.full.index_name, "artist:collab:nn:full:big");
        assert_eq!(config.signals.window_days, 2);
        assert_eq!(config.signals.limit, Some(50));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.author_collab.take, 20);
    }

    #[test]
    fn test_fan_out_defaults_to_ten() {
        let config = TomlConfig::from_toml_str(
            r#"
            [songs]
            index_name = "songs_v2"
            "#,
        )
        .unwrap();
        assert_eq!(config.songs.similarity, table("songs_v2", 10));
        assert_eq!(config.songs.take, 5);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("database_path = [");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
