//! Wire types for the postline listing API.
//!
//! Shared between the server and any client that wants typed access to the
//! listing, aggregate, and authoring endpoints.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Who may see a post. Stored as the `post_visibility` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "post_visibility", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Connections,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Connections => "connections",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVisibility(pub String);

impl fmt::Display for UnknownVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown visibility `{}`", self.0)
    }
}

impl std::error::Error for UnknownVisibility {}

impl FromStr for Visibility {
    type Err = UnknownVisibility;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "connections" => Ok(Visibility::Connections),
            _ => Err(UnknownVisibility(value.to_string())),
        }
    }
}

/// One post as rendered by every listing and authoring endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
    pub user_id: i64,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub likes_count: u64,
    pub views_count: u64,
    pub comments_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Author display name, absent when the identity provider does not know the author.
    pub user: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationView {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_num: Option<u32>,
    pub prev_num: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<PostView>,
    pub pagination: PaginationView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCountView {
    pub tag: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularTagsResponse {
    pub tags: Vec<TagCountView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub message: String,
    pub likes_count: u64,
}

/// JSON body accepted by `POST /api/posts`. Multipart submissions carry the
/// same fields as form parts plus an optional `media` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_parses_case_insensitively() {
        assert_eq!("Public".parse::<Visibility>(), Ok(Visibility::Public));
        assert_eq!(
            " connections ".parse::<Visibility>(),
            Ok(Visibility::Connections)
        );
        assert!("friends".parse::<Visibility>().is_err());
    }

    #[test]
    fn create_request_defaults_missing_fields() {
        let request: CreatePostRequest =
            serde_json::from_str(r#"{"title":"hello"}"#).expect("valid json");
        assert_eq!(request.title.as_deref(), Some("hello"));
        assert!(request.content.is_none());
        assert!(request.tags.is_empty());
        assert!(request.visibility.is_none());
    }

    #[test]
    fn post_view_serializes_rfc3339_timestamps() {
        let view = PostView {
            id: 1,
            title: "t".into(),
            content: "c".into(),
            media_url: None,
            user_id: 7,
            category: None,
            tags: vec![],
            visibility: Visibility::Private,
            likes_count: 0,
            views_count: 0,
            comments_count: 0,
            created_at: time::macros::datetime!(2024-05-01 12:00 UTC),
            updated_at: time::macros::datetime!(2024-05-01 12:00 UTC),
            user: None,
        };

        let json = serde_json::to_value(&view).expect("serializes");
        assert_eq!(json["created_at"], "2024-05-01T12:00:00Z");
        assert_eq!(json["visibility"], "private");
        assert!(json["user"].is_null());
    }
}
