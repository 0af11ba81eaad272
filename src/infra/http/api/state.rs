use std::sync::Arc;

use crate::application::identity::IdentityService;
use crate::application::media::MediaStore;
use crate::application::posts::PostService;
use crate::application::repos::{AuthorsRepo, PostsRepo, PostsWriteRepo, UsersRepo};
use crate::cache::{AggregateStore, AggregateViews, CacheConfig, CacheTrigger};

#[derive(Clone)]
pub struct ApiState {
    pub posts: Arc<PostService>,
    pub identity: Arc<IdentityService>,
    /// Upper bound for a create request body, media included.
    pub upload_limit_bytes: usize,
}

impl ApiState {
    /// Wire services over a storage backend that serves posts, users and authors.
    pub fn assemble<R>(
        repositories: Arc<R>,
        media: Arc<dyn MediaStore>,
        cache: CacheConfig,
        upload_limit_bytes: usize,
    ) -> Self
    where
        R: PostsRepo + PostsWriteRepo + UsersRepo + AuthorsRepo + 'static,
    {
        let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
        let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
        let authors_repo: Arc<dyn AuthorsRepo> = repositories.clone();
        let users_repo: Arc<dyn UsersRepo> = repositories;

        let store = Arc::new(AggregateStore::new(&cache));
        let aggregates = Arc::new(AggregateViews::new(
            cache.clone(),
            store.clone(),
            posts_repo.clone(),
        ));
        let trigger = Arc::new(CacheTrigger::new(cache, store));

        let posts = Arc::new(PostService::new(
            posts_repo,
            posts_write_repo,
            authors_repo,
            media,
            aggregates,
            trigger,
        ));

        Self {
            posts,
            identity: Arc::new(IdentityService::new(users_repo)),
            upload_limit_bytes,
        }
    }
}
