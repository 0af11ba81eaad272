//! In-process storage backend.
//!
//! Mirrors the Postgres adapter's filtering and ordering semantics so the
//! service can run, and be tested, without a database. Tags are kept in their
//! stored text form and decoded on read, the same way rows are.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::{
    AuthorsRepo, CounterDelta, CreatePostParams, CreateUserParams, PostOrder, PostPage,
    PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError, SortField, SortOrder,
    UserCredentialRecord, UsersRepo,
};
use crate::domain::entities::{Counters, PostRecord, UserRecord};
use crate::domain::tags;
use crate::domain::types::Visibility;

#[derive(Debug, Clone)]
struct StoredPost {
    id: i64,
    title: String,
    body: String,
    media_url: Option<String>,
    author_id: i64,
    category: Option<String>,
    raw_tags: Option<String>,
    visibility: Visibility,
    counters: Counters,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl StoredPost {
    fn record(&self) -> PostRecord {
        PostRecord {
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            media_url: self.media_url.clone(),
            author_id: self.author_id,
            category: self.category.clone(),
            tags: tags::decode(self.raw_tags.as_deref()),
            visibility: self.visibility,
            counters: self.counters,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn matches(&self, filter: &PostQueryFilter) -> bool {
        if let Some(search) = filter.search.as_deref() {
            let needle = search.to_lowercase();
            if !self.title.to_lowercase().contains(&needle)
                && !self.body.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(category) = filter.category.as_deref()
            && self.category.as_deref() != Some(category)
        {
            return false;
        }
        if let Some(visibility) = filter.visibility
            && self.visibility != visibility
        {
            return false;
        }
        if let Some(author_id) = filter.author_id
            && self.author_id != author_id
        {
            return false;
        }
        if !filter.tags.is_empty() {
            let carried = tags::decode(self.raw_tags.as_deref());
            if !filter.tags.iter().any(|wanted| carried.contains(wanted)) {
                return false;
            }
        }
        true
    }

    fn compare(&self, other: &Self, order: PostOrder) -> Ordering {
        let by_field = match order.field {
            SortField::CreatedAt => self.created_at.cmp(&other.created_at),
            SortField::LikesCount => self.counters.likes.cmp(&other.counters.likes),
            SortField::ViewsCount => self.counters.views.cmp(&other.counters.views),
            SortField::CommentsCount => self.counters.comments.cmp(&other.counters.comments),
            SortField::Title => self.title.cmp(&other.title),
        };
        let by_field = match order.order {
            SortOrder::Asc => by_field,
            SortOrder::Desc => by_field.reverse(),
        };
        by_field.then_with(|| self.id.cmp(&other.id))
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    record: UserRecord,
    token_prefix: String,
    token_hash: Vec<u8>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_post_id: i64,
    next_user_id: i64,
    posts: BTreeMap<i64, StoredPost>,
    users: BTreeMap<i64, StoredUser>,
}

#[derive(Debug, Default)]
pub struct MemoryRepositories {
    state: RwLock<MemoryState>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored tag text of a post verbatim, bypassing encoding.
    /// Used to seed rows whose tag data predates validation.
    pub async fn overwrite_raw_tags(&self, id: i64, raw: Option<&str>) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.raw_tags = raw.map(str::to_string);
        Ok(())
    }

    /// Set a post's creation time, for fixtures that need a fixed chronology.
    pub async fn backdate_post(&self, id: i64, created_at: OffsetDateTime) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.created_at = created_at;
        Ok(())
    }
}

fn checked_add(current: u64, delta: u64) -> Result<u64, RepoError> {
    current.checked_add(delta).ok_or_else(|| RepoError::Integrity {
        message: "counter overflow".to_string(),
    })
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn query_posts(
        &self,
        filter: &PostQueryFilter,
        order: PostOrder,
        offset: u64,
        limit: u32,
    ) -> Result<PostPage, RepoError> {
        let state = self.state.read().await;
        let mut matched: Vec<&StoredPost> = state
            .posts
            .values()
            .filter(|post| post.matches(filter))
            .collect();
        matched.sort_by(|left, right| left.compare(right, order));

        let total = matched.len() as u64;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(StoredPost::record)
            .collect();

        Ok(PostPage { items, total })
    }

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.get(&id).map(StoredPost::record))
    }

    async fn list_categories(&self) -> Result<Vec<String>, RepoError> {
        let state = self.state.read().await;
        let mut categories: Vec<String> = state
            .posts
            .values()
            .filter_map(|post| post.category.clone())
            .filter(|category| !category.is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn list_tag_sequences(&self) -> Result<Vec<Vec<String>>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .map(|post| tags::decode(post.raw_tags.as_deref()))
            .collect())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        state.next_post_id += 1;
        let id = state.next_post_id;
        let now = OffsetDateTime::now_utc();

        let post = StoredPost {
            id,
            title: params.title,
            body: params.body,
            media_url: params.media_url,
            author_id: params.author_id,
            category: params.category,
            raw_tags: Some(tags::encode(&params.tags)),
            visibility: params.visibility,
            counters: Counters::default(),
            created_at: now,
            updated_at: now,
        };
        let record = post.record();
        state.posts.insert(id, post);
        Ok(record)
    }

    async fn increment_counters(
        &self,
        id: i64,
        delta: CounterDelta,
    ) -> Result<Counters, RepoError> {
        let mut state = self.state.write().await;
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;

        let counters = Counters {
            likes: checked_add(post.counters.likes, delta.likes)?,
            views: checked_add(post.counters.views, delta.views)?,
            comments: checked_add(post.counters.comments, delta.comments)?,
        };
        post.counters = counters;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(counters)
    }

    async fn record_views(&self, ids: &[i64]) -> Result<Vec<(i64, u64)>, RepoError> {
        let mut state = self.state.write().await;
        let now = OffsetDateTime::now_utc();
        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(post) = state.posts.get_mut(id) {
                post.counters.views = checked_add(post.counters.views, 1)?;
                post.updated_at = now;
                updated.push((*id, post.counters.views));
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|user| user.record.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        if state
            .users
            .values()
            .any(|user| user.token_prefix == params.token_prefix)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_token_prefix_key".to_string(),
            });
        }

        state.next_user_id += 1;
        let record = UserRecord {
            id: state.next_user_id,
            username: params.username,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.insert(
            record.id,
            StoredUser {
                record: record.clone(),
                token_prefix: params.token_prefix,
                token_hash: params.token_hash,
            },
        );
        Ok(record)
    }

    async fn find_credential_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<UserCredentialRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.token_prefix == prefix)
            .map(|user| UserCredentialRecord {
                user: user.record.clone(),
                token_prefix: user.token_prefix.clone(),
                token_hash: user.token_hash.clone(),
            }))
    }
}

#[async_trait]
impl AuthorsRepo for MemoryRepositories {
    async fn display_names(&self, ids: &[i64]) -> Result<HashMap<i64, String>, RepoError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .users
                    .get(id)
                    .map(|user| (*id, user.record.username.clone()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(title: &str, author_id: i64, tags: &[&str]) -> CreatePostParams {
        CreatePostParams {
            title: title.to_string(),
            body: format!("{title} body"),
            media_url: None,
            author_id,
            category: Some("general".to_string()),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            visibility: Visibility::Public,
        }
    }

    #[tokio::test]
    async fn ties_are_broken_by_id() {
        let repo = MemoryRepositories::new();
        for title in ["same", "same", "same"] {
            repo.create_post(params(title, 1, &[])).await.expect("create");
        }

        let order = PostOrder {
            field: SortField::Title,
            order: SortOrder::Desc,
        };
        let page = repo
            .query_posts(&PostQueryFilter::default(), order, 0, 10)
            .await
            .expect("query");
        let ids: Vec<i64> = page.items.iter().map(|post| post.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn tag_filter_matches_any_requested_tag() {
        let repo = MemoryRepositories::new();
        repo.create_post(params("a", 1, &["rust"])).await.expect("create");
        repo.create_post(params("b", 1, &["go"])).await.expect("create");
        repo.create_post(params("c", 1, &["zig"])).await.expect("create");

        let filter = PostQueryFilter {
            tags: vec!["rust".into(), "go".into()],
            ..PostQueryFilter::default()
        };
        let page = repo
            .query_posts(&filter, PostOrder::default(), 0, 10)
            .await
            .expect("query");
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn corrupt_tags_read_as_empty() {
        let repo = MemoryRepositories::new();
        let post = repo.create_post(params("a", 1, &["rust"])).await.expect("create");
        repo.overwrite_raw_tags(post.id, Some("not json"))
            .await
            .expect("overwrite");

        let found = repo
            .find_post_by_id(post.id)
            .await
            .expect("find")
            .expect("exists");
        assert!(found.tags.is_empty());
    }

    #[tokio::test]
    async fn increment_on_missing_post_is_not_found() {
        let repo = MemoryRepositories::new();
        let err = repo
            .increment_counters(99, CounterDelta::like())
            .await
            .expect_err("missing post");
        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn record_views_skips_missing_posts() {
        let repo = MemoryRepositories::new();
        let post = repo.create_post(params("a", 1, &[])).await.expect("create");

        let updated = repo.record_views(&[post.id, 42]).await.expect("views");
        assert_eq!(updated, vec![(post.id, 1)]);
    }
}
