//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::Visibility;

/// Engagement counters carried by every post. Never negative, never decreasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub likes: u64,
    pub views: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub media_url: Option<String>,
    pub author_id: i64,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub counters: Counters,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub created_at: OffsetDateTime,
}
