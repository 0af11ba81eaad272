//! Compute-on-miss access to the aggregate views.

use std::sync::Arc;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::tags::{self, TagCount};

use super::config::CacheConfig;
use super::store::{AggregateStore, Lookup};

pub struct AggregateViews {
    config: CacheConfig,
    store: Arc<AggregateStore>,
    posts: Arc<dyn PostsRepo>,
}

impl AggregateViews {
    pub fn new(config: CacheConfig, store: Arc<AggregateStore>, posts: Arc<dyn PostsRepo>) -> Self {
        Self {
            config,
            store,
            posts,
        }
    }

    /// Distinct categories across every post.
    pub async fn categories(&self) -> Result<Vec<String>, RepoError> {
        if !self.config.is_enabled() {
            return self.posts.list_categories().await;
        }

        match self.store.categories() {
            Lookup::Hit(categories) => Ok(categories),
            Lookup::Miss(generation) => {
                let categories = self.posts.list_categories().await?;
                self.store.fill_categories(generation, categories.clone());
                Ok(categories)
            }
        }
    }

    /// The `limit` most used tags, highest count first.
    pub async fn popular_tags(&self, limit: u32) -> Result<Vec<TagCount>, RepoError> {
        if !self.config.is_enabled() {
            return self.compute_popular_tags(limit).await;
        }

        match self.store.popular_tags(limit) {
            Lookup::Hit(tags) => Ok(tags),
            Lookup::Miss(generation) => {
                let ranked = self.compute_popular_tags(limit).await?;
                self.store.fill_popular_tags(generation, limit, ranked.clone());
                Ok(ranked)
            }
        }
    }

    async fn compute_popular_tags(&self, limit: u32) -> Result<Vec<TagCount>, RepoError> {
        let sequences = self.posts.list_tag_sequences().await?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(tags::rank(sequences, limit))
    }
}
