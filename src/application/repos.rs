//! Repository traits describing persistence adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Counters, PostRecord, UserRecord};
use crate::domain::types::Visibility;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Predicate part of a listing query. Every populated field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQueryFilter {
    /// Case-insensitive substring over title or body.
    pub search: Option<String>,
    pub category: Option<String>,
    /// `None` matches every visibility level.
    pub visibility: Option<Visibility>,
    /// Match posts carrying any of these tags.
    pub tags: Vec<String>,
    pub author_id: Option<i64>,
}

/// Whitelisted sort columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    LikesCount,
    ViewsCount,
    CommentsCount,
    Title,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "created_at" => Some(SortField::CreatedAt),
            "likes_count" => Some(SortField::LikesCount),
            "views_count" => Some(SortField::ViewsCount),
            "comments_count" => Some(SortField::CommentsCount),
            "title" => Some(SortField::Title),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::LikesCount => "likes_count",
            SortField::ViewsCount => "views_count",
            SortField::CommentsCount => "comments_count",
            SortField::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Ordering for a listing. Ties on `field` are always broken by id ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostOrder {
    pub field: SortField,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostPage {
    pub items: Vec<PostRecord>,
    pub total: u64,
}

/// Amounts to add to a post's counters in one atomic store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub likes: u64,
    pub views: u64,
    pub comments: u64,
}

impl CounterDelta {
    pub fn like() -> Self {
        Self {
            likes: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub body: String,
    pub media_url: Option<String>,
    pub author_id: i64,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Execute a filtered, ordered page query and report the total match count.
    async fn query_posts(
        &self,
        filter: &PostQueryFilter,
        order: PostOrder,
        offset: u64,
        limit: u32,
    ) -> Result<PostPage, RepoError>;

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;

    /// Distinct non-empty categories, sorted ascending.
    async fn list_categories(&self) -> Result<Vec<String>, RepoError>;

    /// Every post's decoded tag sequence.
    async fn list_tag_sequences(&self) -> Result<Vec<Vec<String>>, RepoError>;

    async fn ping(&self) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Add `delta` to the counters of post `id`, returning the new values.
    /// Fails with [`RepoError::NotFound`] when the post does not exist.
    async fn increment_counters(&self, id: i64, delta: CounterDelta)
    -> Result<Counters, RepoError>;

    /// Add one view to each listed post, returning the new view counts of the
    /// posts that still exist.
    async fn record_views(&self, ids: &[i64]) -> Result<Vec<(i64, u64)>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub token_prefix: String,
    pub token_hash: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UserCredentialRecord {
    pub user: UserRecord,
    pub token_prefix: String,
    pub token_hash: Vec<u8>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_credential_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<UserCredentialRecord>, RepoError>;
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    /// Display names for the given user ids. Unknown ids are simply absent.
    async fn display_names(&self, ids: &[i64]) -> Result<HashMap<i64, String>, RepoError>;
}
