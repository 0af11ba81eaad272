use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{PostOrder, PostPage, PostQueryFilter, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::tags;
use crate::infra::db::map_sqlx_error;

use super::PostgresRepositories;
use super::types::{POST_COLUMNS, PostRow, records_from_rows};

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn query_posts(
        &self,
        filter: &PostQueryFilter,
        order: PostOrder,
        offset: u64,
        limit: u32,
    ) -> Result<PostPage, RepoError> {
        let offset = i64::try_from(offset).map_err(|_| RepoError::InvalidInput {
            message: format!("offset {offset} exceeds supported range"),
        })?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM posts WHERE 1=1 ");
        Self::apply_post_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);
        Self::push_order(&mut qb, order);
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostPage {
            items: records_from_rows(rows)?,
            total: Self::convert_count(total)?,
        })
    }

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts WHERE id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostRecord::try_from).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM posts \
             WHERE category IS NOT NULL AND category <> '' \
             ORDER BY category",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_tag_sequences(&self) -> Result<Vec<Vec<String>>, RepoError> {
        let raw = sqlx::query_scalar::<_, Option<String>>("SELECT tags FROM posts")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(raw
            .iter()
            .map(|value| tags::decode(value.as_deref()))
            .collect())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
