//! Redis similarity index
//!
//! Neighbor lists live under `<index_name>:<id>`, best match first. Reads
//! go through a [`ConnectionManager`], which multiplexes concurrent lookups
//! over one reconnecting connection.

use anyhow::{Context, Result};
use async_trait::async_trait;
use recflow_core::services::SimilarityIndex;
use recflow_core::EntityId;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::path::Path;
use tracing::{debug, info};

/// Redis key holding the neighbors of `id` in `index_name`
pub fn index_key(index_name: &str, id: &impl std::fmt::Display) -> String {
    format!("{}:{}", index_name, id)
}

#[derive(Clone)]
pub struct RedisSimilarityIndex {
    conn: ConnectionManager,
}

impl RedisSimilarityIndex {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).with_context(|| format!("Invalid Redis URL: {}", url))?;
        let conn = ConnectionManager::new(client)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", url))?;
        info!("Connected to Redis: {}", url);
        Ok(Self { conn })
    }

    /// Replace the neighbor list of every entry
    pub async fn populate(&self, index_name: &str, entries: &[(String, Vec<String>)]) -> Result<usize> {
        let mut conn = self.conn.clone();
        let mut written = 0;

        for (id, neighbors) in entries {
            let key = index_key(index_name, id);
            let mut pipe = redis::pipe();
            pipe.atomic().del(&key).ignore();
            if !neighbors.is_empty() {
                pipe.rpush(&key, neighbors).ignore();
            }
            let _: () = pipe
                .query_async(&mut conn)
                .await
                .with_context(|| format!("Failed to write {}", key))?;
            written += 1;
        }

        info!(index = index_name, keys = written, "Populated similarity index");
        Ok(written)
    }
}

#[async_trait]
impl SimilarityIndex for RedisSimilarityIndex {
    async fn neighbors(&self, index_name: &str, id: &EntityId, fan_out: usize) -> Result<Vec<EntityId>> {
        // LRANGE 0 -1 would return the whole list
        if fan_out == 0 {
            return Ok(Vec::new());
        }

        let key = index_key(index_name, id);
        let mut conn = self.conn.clone();
        let stop = isize::try_from(fan_out - 1).unwrap_or(isize::MAX);
        let raw: Vec<String> = conn.lrange(&key, 0, stop).await?;
        debug!(key = %key, neighbors = raw.len(), "LRANGE");

        Ok(raw.iter().map(|s| EntityId::parse(s)).collect())
    }
}

/// Parse a neighbor file: one `<id> <n1> <n2> ...` entry per line.
///
/// Blank lines are skipped; a repeated id keeps its last line.
pub fn parse_neighbor_file(content: &str) -> Vec<(String, Vec<String>)> {
    let mut entries: Vec<(String, Vec<String>)> = Vec::new();

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let Some(id) = fields.next() else {
            continue;
        };
        let neighbors = fields.map(str::to_string).collect();

        match entries.iter_mut().find(|(existing, _)| existing == id) {
            Some(entry) => entry.1 = neighbors,
            None => entries.push((id.to_string(), neighbors)),
        }
    }

    entries
}

/// Load `path` into `index_name`, returning the number of keys written
pub async fn populate_from_file(index: &RedisSimilarityIndex, index_name: &str, path: &Path) -> Result<usize> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read neighbor file {:?}", path))?;
    let entries = parse_neighbor_file(&content);
    info!(index = index_name, entries = entries.len(), file = %path.display(), "Parsed neighbor file");
    index.populate(index_name, &entries).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines() {
        let entries = parse_neighbor_file("1 2 3\n\n   \n2 3\n");
        assert_eq!(
            entries,
            vec![
                ("1".to_string(), vec!["2".to_string(), "3".to_string()]),
                ("2".to_string(), vec!["3".to_string()]),
            ]
        );
    }

    #[test]
    fn test_parse_keeps_id_without_neighbors() {
        let entries = parse_neighbor_file("artist:a\nartist:b artist:a");
        assert_eq!(entries[0], ("artist:a".to_string(), Vec::new()));
        assert_eq!(entries[1].1, vec!["artist:a".to_string()]);
    }

    #[test]
    fn test_repeated_id_keeps_last_line() {
        let entries = parse_neighbor_file("1 2\n1 3 4\n");
        assert_eq!(entries, vec![("1".to_string(), vec!["3".to_string(), "4".to_string()])]);
    }

    #[test]
    fn test_index_key_format() {
        assert_eq!(index_key("songs_collab_v1", &EntityId::from(20000)), "songs_collab_v1:20000");
        assert_eq!(index_key("artist:collab:nn:full:big", &"30001"), "artist:collab:nn:full:big:30001");
    }
}
