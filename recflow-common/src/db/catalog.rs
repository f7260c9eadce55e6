//! Song and author catalog queries

use crate::db::models::{Author, Song};
use crate::db::placeholders;
use crate::Result;
use sqlx::{Row, SqlitePool};

pub async fn insert_song(pool: &SqlitePool, song: &Song) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (id, name, length, genre, author_id)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            length = excluded.length,
            genre = excluded.genre,
            author_id = excluded.author_id
        "#,
    )
    .bind(song.id)
    .bind(&song.name)
    .bind(song.length)
    .bind(&song.genre)
    .bind(&song.author_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_author(pool: &SqlitePool, author: &Author) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO authors (id, name) VALUES (?, ?)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name
        "#,
    )
    .bind(&author.id)
    .bind(&author.name)
    .execute(pool)
    .await?;

    Ok(())
}

/// Songs whose id is in `ids`. Unknown ids are skipped.
pub async fn load_songs(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Song>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, name, length, genre, author_id FROM songs WHERE id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| Song {
            id: row.get("id"),
            name: row.get("name"),
            length: row.get("length"),
            genre: row.get("genre"),
            author_id: row.get("author_id"),
        })
        .collect())
}

/// Authors whose id is in `ids`. Unknown ids are skipped.
pub async fn load_authors(pool: &SqlitePool, ids: &[String]) -> Result<Vec<Author>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, name FROM authors WHERE id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| Author {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}
