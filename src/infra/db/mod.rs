//! Postgres-backed repository implementations.

mod posts;
mod users;
mod util;

pub use util::{escape_like, map_sqlx_error};

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{PostOrder, PostQueryFilter, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn apply_post_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostQueryFilter) {
        if let Some(search) = filter.search.as_ref() {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR content ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        if let Some(category) = filter.category.as_ref() {
            qb.push(" AND category = ");
            qb.push_bind(category);
        }

        if let Some(visibility) = filter.visibility {
            qb.push(" AND visibility = ");
            qb.push_bind(visibility);
        }

        if !filter.tags.is_empty() {
            qb.push(" AND jsonb_exists_any(post_tags_array(tags), ");
            qb.push_bind(filter.tags.clone());
            qb.push(")");
        }

        if let Some(author_id) = filter.author_id {
            qb.push(" AND user_id = ");
            qb.push_bind(author_id);
        }
    }

    fn push_order(qb: &mut QueryBuilder<'_, Postgres>, order: PostOrder) {
        qb.push(" ORDER BY ");
        qb.push(order.field.column());
        qb.push(" ");
        qb.push(order.order.keyword());
        qb.push(", id ASC");
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }

    fn convert_delta(value: u64) -> Result<i64, RepoError> {
        value.try_into().map_err(|_| RepoError::InvalidInput {
            message: format!("counter delta {value} exceeds supported range"),
        })
    }
}
