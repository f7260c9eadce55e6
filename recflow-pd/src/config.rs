//! Program director configuration
//!
//! Combines the TOML bootstrap file with command-line overrides and turns
//! the flow sections into stage option providers.

use chrono::Duration;
use recflow_common::config::{SignalsConfig, SimilarityTable, TomlConfig};
use recflow_core::{Provider, RecentSongsOptions, SignalOptions, SimilarityOptions};
use std::path::PathBuf;

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub redis_url: Option<String>,
    pub log_level: Option<String>,
    pub bind: Option<String>,
}

impl ConfigOverrides {
    /// Apply overrides on top of the file configuration
    pub fn apply(self, mut config: TomlConfig) -> TomlConfig {
        if let Some(path) = self.database_path {
            config.database_path = path;
        }
        if let Some(url) = self.redis_url {
            config.redis_url = url;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        config
    }
}

pub fn similarity_options(table: &SimilarityTable) -> SimilarityOptions {
    SimilarityOptions::new(table.index_name.clone()).with_fan_out(table.fan_out)
}

/// Rolling signal window, recomputed each time a signal stage runs
pub fn signal_options(signals: &SignalsConfig) -> Provider<SignalOptions> {
    SignalOptions::rolling_window(Duration::days(signals.window_days), signals.limit)
}

pub fn recent_songs_options(songs_per_author: Option<usize>) -> RecentSongsOptions {
    RecentSongsOptions {
        fan_out: songs_per_author,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_overrides_replace_file_values() {
        let overrides = ConfigOverrides {
            redis_url: Some("redis://other:6379/".to_string()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        let config = overrides.apply(TomlConfig::default());
        assert_eq!(config.redis_url, "redis://other:6379/");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.songs.similarity.index_name, "songs_collab_v1");
    }

    #[test]
    fn test_signal_window_is_relative_to_now() {
        let provider = signal_options(&SignalsConfig::default());
        let before = Utc::now() - Duration::days(2);
        let options = provider.resolve();
        let after = Utc::now() - Duration::days(2);

        let since = options.since.unwrap();
        assert!(since >= before && since <= after);
        assert_eq!(options.limit, Some(50));
    }

    #[test]
    fn test_similarity_table_conversion() {
        let table = SimilarityTable {
            index_name: "authors_collab_v1".to_string(),
            fan_out: 3,
        };
        assert_eq!(similarity_options(&table), SimilarityOptions::new("authors_collab_v1").with_fan_out(3));
    }
}
