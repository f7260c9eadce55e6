//! User signal queries (likes and saves)
//!
//! All results are most recent first. `since` is a unix timestamp lower
//! bound (inclusive); `limit` caps the number of ids returned.

use crate::db::models::{Interaction, InteractionKind};
use crate::Result;
use sqlx::{Row, SqlitePool};

/// Record a like or save, replacing any earlier event for the same song
pub async fn record_interaction(
    pool: &SqlitePool,
    kind: InteractionKind,
    interaction: &Interaction,
) -> Result<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {} (user_id, song_id, event_time)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id, song_id) DO UPDATE SET
            event_time = excluded.event_time
        "#,
        kind.table()
    ))
    .bind(interaction.user_id)
    .bind(interaction.song_id)
    .bind(interaction.event_time)
    .execute(pool)
    .await?;

    Ok(())
}

/// Song ids the user liked or saved
pub async fn recent_song_ids(
    pool: &SqlitePool,
    kind: InteractionKind,
    user_id: i64,
    since: Option<i64>,
    limit: Option<u32>,
) -> Result<Vec<i64>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT song_id
        FROM {}
        WHERE user_id = ? AND event_time >= ?
        ORDER BY event_time DESC, rowid DESC
        LIMIT ?
        "#,
        kind.table()
    ))
    .bind(user_id)
    .bind(since.unwrap_or(i64::MIN))
    .bind(sql_limit(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| row.get("song_id")).collect())
}

/// Distinct author ids of the songs the user liked or saved, ordered by
/// each author's most recent interaction
pub async fn recent_author_ids(
    pool: &SqlitePool,
    kind: InteractionKind,
    user_id: i64,
    since: Option<i64>,
    limit: Option<u32>,
) -> Result<Vec<String>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT s.author_id AS author_id, MAX(i.event_time) AS last_event
        FROM {} i
        JOIN songs s ON s.id = i.song_id
        WHERE i.user_id = ? AND i.event_time >= ? AND s.author_id IS NOT NULL
        GROUP BY s.author_id
        ORDER BY last_event DESC, s.author_id
        LIMIT ?
        "#,
        kind.table()
    ))
    .bind(user_id)
    .bind(since.unwrap_or(i64::MIN))
    .bind(sql_limit(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| row.get("author_id")).collect())
}

/// SQLite treats a negative LIMIT as "no limit"
fn sql_limit(limit: Option<u32>) -> i64 {
    limit.map(i64::from).unwrap_or(-1)
}
