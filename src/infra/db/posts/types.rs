use time::OffsetDateTime;

use crate::application::repos::RepoError;
use crate::domain::entities::{Counters, PostRecord};
use crate::domain::tags;
use crate::domain::types::Visibility;

use super::PostgresRepositories;

pub(crate) const POST_COLUMNS: &str = "id, title, content, media_url, user_id, category, tags, \
     visibility, likes_count, views_count, comments_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) media_url: Option<String>,
    pub(crate) user_id: i64,
    pub(crate) category: Option<String>,
    pub(crate) tags: Option<String>,
    pub(crate) visibility: Visibility,
    pub(crate) likes_count: i64,
    pub(crate) views_count: i64,
    pub(crate) comments_count: i64,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl TryFrom<PostRow> for PostRecord {
    type Error = RepoError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            body: row.content,
            media_url: row.media_url,
            author_id: row.user_id,
            category: row.category,
            tags: tags::decode(row.tags.as_deref()),
            visibility: row.visibility,
            counters: Counters {
                likes: PostgresRepositories::convert_count(row.likes_count)?,
                views: PostgresRepositories::convert_count(row.views_count)?,
                comments: PostgresRepositories::convert_count(row.comments_count)?,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CountersRow {
    pub(crate) likes_count: i64,
    pub(crate) views_count: i64,
    pub(crate) comments_count: i64,
}

impl TryFrom<CountersRow> for Counters {
    type Error = RepoError;

    fn try_from(row: CountersRow) -> Result<Self, Self::Error> {
        Ok(Self {
            likes: PostgresRepositories::convert_count(row.likes_count)?,
            views: PostgresRepositories::convert_count(row.views_count)?,
            comments: PostgresRepositories::convert_count(row.comments_count)?,
        })
    }
}

pub(crate) fn records_from_rows(rows: Vec<PostRow>) -> Result<Vec<PostRecord>, RepoError> {
    rows.into_iter().map(PostRecord::try_from).collect()
}
