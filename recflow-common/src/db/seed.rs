//! Demo data: two users, six authors, seven songs and a few interactions

use crate::db::catalog::{insert_author, insert_song};
use crate::db::models::{Author, Interaction, InteractionKind, Song, User};
use crate::db::signals::record_interaction;
use crate::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

pub const JOE: i64 = 10000;
pub const MIKE: i64 = 10001;

pub fn demo_users() -> Vec<User> {
    vec![
        User { id: JOE, name: "Joe".to_string() },
        User { id: MIKE, name: "Mike".to_string() },
    ]
}

pub fn demo_authors() -> Vec<Author> {
    ["Disturbed", "Metallica", "Godsmack", "AC/DC", "Eminem", "Yelawolf"]
        .iter()
        .enumerate()
        .map(|(i, name)| Author {
            id: (30000 + i).to_string(),
            name: name.to_string(),
        })
        .collect()
}

pub fn demo_songs() -> Vec<Song> {
    let songs: [(&str, i64, &str, usize); 7] = [
        ("Immortalized", 258, "Heavy Metal", 30000),
        ("The Sound Of Silence", 246, "Heavy Metal", 30000),
        ("Enter Sandman", 328, "Heavy Metal", 30001),
        ("Bulletproof", 147, "Hard Rock", 30002),
        ("Thunderstruck", 256, "Hard Rock", 30003),
        ("Rap God", 360, "Hip-Hop", 30004),
        ("Best Friend", 270, "Hip-Hop", 30005),
    ];

    songs
        .iter()
        .enumerate()
        .map(|(i, (name, length, genre, author))| Song {
            id: 20000 + i as i64,
            name: name.to_string(),
            length: Some(*length),
            genre: Some(genre.to_string()),
            author_id: Some(author.to_string()),
        })
        .collect()
}

/// Likes and saves, stamped relative to `now` (unix seconds)
pub fn demo_interactions(now: i64) -> Vec<(InteractionKind, Interaction)> {
    let hour = 3600;
    vec![
        (
            InteractionKind::Liked,
            Interaction { user_id: JOE, song_id: 20000, event_time: now - hour },
        ),
        (
            InteractionKind::Liked,
            Interaction { user_id: MIKE, song_id: 20005, event_time: now - 2 * hour },
        ),
        (
            InteractionKind::Saved,
            Interaction { user_id: JOE, song_id: 20002, event_time: now - 3 * hour },
        ),
    ]
}

async fn insert_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query("INSERT INTO users (id, name) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET name = excluded.name")
        .bind(user.id)
        .bind(&user.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Insert the demo data set. Re-running refreshes rows in place.
pub async fn insert_demo_data(pool: &SqlitePool) -> Result<()> {
    let users = demo_users();
    for user in &users {
        insert_user(pool, user).await?;
    }

    let authors = demo_authors();
    for author in &authors {
        insert_author(pool, author).await?;
    }

    let songs = demo_songs();
    for song in &songs {
        insert_song(pool, song).await?;
    }
    info!(users = users.len(), authors = authors.len(), songs = songs.len(), "Inserted demo nodes");

    let interactions = demo_interactions(Utc::now().timestamp());
    for (kind, interaction) in &interactions {
        record_interaction(pool, *kind, interaction).await?;
    }
    info!(interactions = interactions.len(), "Inserted demo edges");

    Ok(())
}
