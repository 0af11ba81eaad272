use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    AuthorsRepo, CreateUserParams, RepoError, UserCredentialRecord, UsersRepo,
};
use crate::domain::entities::UserRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    username: String,
    created_at: OffsetDateTime,
    token_prefix: String,
    token_hash: Vec<u8>,
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, token_prefix, token_hash) VALUES ($1, $2, $3) \
             RETURNING id, username, created_at",
        )
        .bind(params.username)
        .bind(params.token_prefix)
        .bind(params.token_hash)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }

    async fn find_credential_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<UserCredentialRecord>, RepoError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, username, created_at, token_prefix, token_hash \
             FROM users WHERE token_prefix = $1",
        )
        .bind(prefix)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| UserCredentialRecord {
            user: UserRecord {
                id: row.id,
                username: row.username,
                created_at: row.created_at,
            },
            token_prefix: row.token_prefix,
            token_hash: row.token_hash,
        }))
    }
}

#[async_trait]
impl AuthorsRepo for PostgresRepositories {
    async fn display_names(&self, ids: &[i64]) -> Result<HashMap<i64, String>, RepoError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, username FROM users WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().collect())
    }
}
