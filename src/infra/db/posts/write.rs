use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{CounterDelta, CreatePostParams, PostsWriteRepo, RepoError};
use crate::domain::entities::{Counters, PostRecord};
use crate::domain::tags;
use crate::infra::db::map_sqlx_error;

use super::PostgresRepositories;
use super::types::{CountersRow, POST_COLUMNS, PostRow};

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            body,
            media_url,
            author_id,
            category,
            tags: post_tags,
            visibility,
        } = params;

        let mut qb = QueryBuilder::new(
            "INSERT INTO posts (title, content, media_url, user_id, category, tags, visibility) VALUES (",
        );
        let mut values = qb.separated(", ");
        values.push_bind(title);
        values.push_bind(body);
        values.push_bind(media_url);
        values.push_bind(author_id);
        values.push_bind(category);
        values.push_bind(tags::encode(&post_tags));
        values.push_bind(visibility);
        qb.push(") RETURNING ");
        qb.push(POST_COLUMNS);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        PostRecord::try_from(row)
    }

    async fn increment_counters(
        &self,
        id: i64,
        delta: CounterDelta,
    ) -> Result<Counters, RepoError> {
        let row = sqlx::query_as::<_, CountersRow>(
            "UPDATE posts SET \
                 likes_count = likes_count + $2, \
                 views_count = views_count + $3, \
                 comments_count = comments_count + $4, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING likes_count, views_count, comments_count",
        )
        .bind(id)
        .bind(Self::convert_delta(delta.likes)?)
        .bind(Self::convert_delta(delta.views)?)
        .bind(Self::convert_delta(delta.comments)?)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Counters::try_from(row)
    }

    async fn record_views(&self, ids: &[i64]) -> Result<Vec<(i64, u64)>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, (i64, i64)>(
            "UPDATE posts SET views_count = views_count + 1, updated_at = now() \
             WHERE id = ANY($1) \
             RETURNING id, views_count",
        )
        .bind(ids.to_vec())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(id, views)| Ok((id, Self::convert_count(views)?)))
            .collect()
    }
}
