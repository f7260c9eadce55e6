//! Recently added songs per author

use crate::db::placeholders;
use crate::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// Song ids per author, newest first, at most `per_author` each when set.
/// Authors without songs are absent from the map.
pub async fn recent_songs_by_author(
    pool: &SqlitePool,
    author_ids: &[String],
    per_author: Option<usize>,
) -> Result<HashMap<String, Vec<i64>>> {
    if author_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        r#"
        SELECT id, author_id
        FROM songs
        WHERE author_id IN ({})
        ORDER BY added_at DESC, id DESC
        "#,
        placeholders(author_ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in author_ids {
        query = query.bind(id);
    }

    let mut by_author: HashMap<String, Vec<i64>> = HashMap::new();
    for row in query.fetch_all(pool).await? {
        let songs = by_author.entry(row.get("author_id")).or_default();
        if per_author.map_or(true, |cap| songs.len() < cap) {
            songs.push(row.get("id"));
        }
    }

    by_author.retain(|_, songs| !songs.is_empty());
    Ok(by_author)
}
