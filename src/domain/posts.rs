//! Authoring rules for new posts.

use crate::domain::{error::DomainError, tags, types::Visibility};

pub const TITLE_MAX_CHARS: usize = 255;
pub const CATEGORY_MAX_CHARS: usize = 100;
pub const DEFAULT_CATEGORY: &str = "general";

/// Unvalidated authoring input as it arrives from a request.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPost {
    pub title: String,
    pub body: String,
    pub category: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

impl PostDraft {
    pub fn validate(self) -> Result<ValidatedPost, DomainError> {
        let title = self
            .title
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| DomainError::missing("title"))?;
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(DomainError::too_long("title", TITLE_MAX_CHARS));
        }

        let body = self
            .body
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| DomainError::missing("content"))?;

        let category = self
            .category
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        if category.chars().count() > CATEGORY_MAX_CHARS {
            return Err(DomainError::too_long("category", CATEGORY_MAX_CHARS));
        }

        Ok(ValidatedPost {
            title,
            body,
            category,
            tags: tags::normalize(self.tags),
            visibility: self.visibility.unwrap_or_default(),
        })
    }
}
