//! Database models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}

/// Author (artist). Ids are opaque text: numeric ids or URIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub name: String,
    /// Length in seconds
    pub length: Option<i64>,
    pub genre: Option<String>,
    pub author_id: Option<String>,
}

/// Which interaction table a signal comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Liked,
    Saved,
}

impl InteractionKind {
    pub fn table(&self) -> &'static str {
        match self {
            InteractionKind::Liked => "users_liked_songs",
            InteractionKind::Saved => "users_saved_songs",
        }
    }
}

/// A like or save, timestamped in unix seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: i64,
    pub song_id: i64,
    pub event_time: i64,
}
