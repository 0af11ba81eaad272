//! Listing, authoring and engagement use cases for posts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::listing::{ListingParams, ListingQuery, ListingShape, popular_tags_limit};
use crate::application::media::{MediaError, MediaStore, MediaUpload};
use crate::application::pagination::PageMeta;
use crate::application::repos::{
    AuthorsRepo, CounterDelta, CreatePostParams, PostsRepo, PostsWriteRepo, RepoError,
};
use crate::cache::{AggregateViews, CacheTrigger};
use crate::domain::{
    entities::PostRecord, error::DomainError, posts::PostDraft, tags::TagCount,
};

const TARGET: &str = "postline::application::posts";

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("post {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A post together with its author's display name.
#[derive(Debug, Clone, PartialEq)]
pub struct PostEntry {
    pub record: PostRecord,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostListing {
    pub entries: Vec<PostEntry>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone)]
pub struct NewPostCommand {
    pub author_id: i64,
    pub draft: PostDraft,
    pub media: Option<MediaUpload>,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    authors: Arc<dyn AuthorsRepo>,
    media: Arc<dyn MediaStore>,
    aggregates: Arc<AggregateViews>,
    cache_trigger: Arc<CacheTrigger>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        authors: Arc<dyn AuthorsRepo>,
        media: Arc<dyn MediaStore>,
        aggregates: Arc<AggregateViews>,
        cache_trigger: Arc<CacheTrigger>,
    ) -> Self {
        Self {
            reader,
            writer,
            authors,
            media,
            aggregates,
            cache_trigger,
        }
    }

    /// Run a listing query and count a view for every post on the page.
    pub async fn list(
        &self,
        params: &ListingParams,
        shape: ListingShape,
    ) -> Result<PostListing, PostServiceError> {
        let query = ListingQuery::compose(params, shape);
        let page = self
            .reader
            .query_posts(
                &query.filter,
                query.order,
                query.page.offset(),
                query.page.per_page(),
            )
            .await?;

        let mut items = page.items;
        self.record_views(&mut items).await;
        let entries = self.attach_authors(items).await;

        Ok(PostListing {
            entries,
            meta: PageMeta::new(query.page, page.total),
        })
    }

    pub async fn create(&self, command: NewPostCommand) -> Result<PostEntry, PostServiceError> {
        let NewPostCommand {
            author_id,
            draft,
            media,
        } = command;
        let post = draft.validate()?;

        let media_url = match media {
            Some(upload) => Some(self.media.store(author_id, upload).await?),
            None => None,
        };

        let created = self
            .writer
            .create_post(CreatePostParams {
                title: post.title,
                body: post.body,
                media_url: media_url.clone(),
                author_id,
                category: Some(post.category),
                tags: post.tags,
                visibility: post.visibility,
            })
            .await;

        let record = match created {
            Ok(record) => record,
            Err(err) => {
                if let Some(url) = media_url.as_deref() {
                    self.discard_media(url).await;
                }
                return Err(err.into());
            }
        };

        self.cache_trigger.post_created(record.id);
        info!(
            target: TARGET,
            post_id = record.id,
            author_id,
            has_media = record.media_url.is_some(),
            "Post created"
        );

        let author_name = self
            .author_names(&[record.author_id])
            .await
            .remove(&record.author_id);
        Ok(PostEntry {
            record,
            author_name,
        })
    }

    /// Add one like and return the new like count.
    pub async fn like(&self, post_id: i64) -> Result<u64, PostServiceError> {
        let counters = self
            .writer
            .increment_counters(post_id, CounterDelta::like())
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PostServiceError::NotFound(post_id),
                other => PostServiceError::Repo(other),
            })?;

        self.cache_trigger.post_liked(post_id);
        Ok(counters.likes)
    }

    pub async fn categories(&self) -> Result<Vec<String>, PostServiceError> {
        Ok(self.aggregates.categories().await?)
    }

    pub async fn popular_tags(
        &self,
        raw_limit: Option<&str>,
    ) -> Result<Vec<TagCount>, PostServiceError> {
        let limit = popular_tags_limit(raw_limit);
        Ok(self.aggregates.popular_tags(limit).await?)
    }

    pub async fn health(&self) -> Result<(), PostServiceError> {
        Ok(self.reader.ping().await?)
    }

    /// Best effort: a failed view update is logged and the page is served as read.
    async fn record_views(&self, items: &mut [PostRecord]) {
        if items.is_empty() {
            return;
        }

        let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
        match self.writer.record_views(&ids).await {
            Ok(updated) => {
                let views: HashMap<i64, u64> = updated.into_iter().collect();
                for item in items.iter_mut() {
                    if let Some(count) = views.get(&item.id) {
                        item.counters.views = *count;
                    }
                }
            }
            Err(err) => {
                warn!(
                    target: TARGET,
                    error = %err,
                    posts = ids.len(),
                    "Failed to record listing views"
                );
            }
        }
    }

    async fn attach_authors(&self, items: Vec<PostRecord>) -> Vec<PostEntry> {
        let mut seen = HashSet::new();
        let author_ids: Vec<i64> = items
            .iter()
            .map(|item| item.author_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let names = self.author_names(&author_ids).await;

        items
            .into_iter()
            .map(|record| PostEntry {
                author_name: names.get(&record.author_id).cloned(),
                record,
            })
            .collect()
    }

    /// Author display names are decoration; a failed lookup leaves them blank.
    async fn author_names(&self, author_ids: &[i64]) -> HashMap<i64, String> {
        if author_ids.is_empty() {
            return HashMap::new();
        }

        match self.authors.display_names(author_ids).await {
            Ok(names) => names,
            Err(err) => {
                warn!(
                    target: TARGET,
                    error = %err,
                    authors = author_ids.len(),
                    "Failed to resolve author names"
                );
                HashMap::new()
            }
        }
    }

    async fn discard_media(&self, url: &str) {
        if let Err(err) = self.media.discard(url).await {
            warn!(
                target: TARGET,
                error = %err,
                media_url = url,
                "Failed to discard media after aborted post creation"
            );
        }
    }
}
