//! Bearer-token identity for API callers.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

const TOKEN_TAG: &str = "pl";
const MIN_SECRET_LEN: usize = 32;
const USERNAME_MAX_CHARS: usize = 80;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("username must be between 1 and {USERNAME_MAX_CHARS} characters")]
    InvalidUsername,
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid bearer token")]
    Invalid,
    #[error("identity lookup failed: {0}")]
    Unavailable(#[source] RepoError),
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct IssuedIdentity {
    pub user: UserRecord,
    pub token: String,
}

#[derive(Clone)]
pub struct IdentityService {
    repo: Arc<dyn UsersRepo>,
}

impl IdentityService {
    pub fn new(repo: Arc<dyn UsersRepo>) -> Self {
        Self { repo }
    }

    /// Register a user and hand back the only copy of their token.
    pub async fn issue(&self, username: &str) -> Result<IssuedIdentity, IdentityError> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > USERNAME_MAX_CHARS {
            return Err(IdentityError::InvalidUsername);
        }

        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_TAG}_{prefix}_{secret}");

        let user = self
            .repo
            .create_user(CreateUserParams {
                username: username.to_string(),
                token_prefix: prefix,
                token_hash: Self::hash_secret(&secret),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => IdentityError::UsernameTaken(username.to_string()),
                other => IdentityError::Repo(other),
            })?;

        Ok(IssuedIdentity { user, token })
    }

    pub async fn authenticate(&self, token: &str) -> Result<Caller, AuthError> {
        let parsed = Self::parse_token(token).ok_or(AuthError::Invalid)?;
        let credential = self
            .repo
            .find_credential_by_prefix(parsed.prefix)
            .await
            .map_err(AuthError::Unavailable)?
            .ok_or(AuthError::Invalid)?;

        let hashed_input = Self::hash_secret(parsed.secret);
        if credential.token_hash.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }

        Ok(Caller {
            user_id: credential.user.id,
            username: credential.user.username,
        })
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
        let mut parts = token.trim().splitn(3, '_');
        if parts.next()? != TOKEN_TAG {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
            return None;
        }
        Some(ParsedToken { prefix, secret })
    }
}

struct ParsedToken<'a> {
    prefix: &'a str,
    secret: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryRepositories;

    fn service() -> IdentityService {
        IdentityService::new(Arc::new(MemoryRepositories::new()))
    }

    #[tokio::test]
    async fn issued_token_authenticates() {
        let identity = service();
        let issued = identity.issue("ada").await.expect("issue");
        assert!(issued.token.starts_with("pl_"));

        let caller = identity.authenticate(&issued.token).await.expect("auth");
        assert_eq!(caller.user_id, issued.user.id);
        assert_eq!(caller.username, "ada");
    }

    #[tokio::test]
    async fn tampered_secret_is_rejected() {
        let identity = service();
        let issued = identity.issue("ada").await.expect("issue");
        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push('!');

        assert!(matches!(
            identity.authenticate(&tampered).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn malformed_tokens_are_rejected() {
        let identity = service();
        for token in ["", "pl_", "sk_abc_0123456789abcdef0123456789abcdef", "pl_abc_short"] {
            assert!(matches!(
                identity.authenticate(token).await,
                Err(AuthError::Invalid)
            ));
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_reported() {
        let identity = service();
        identity.issue("ada").await.expect("first issue");
        assert!(matches!(
            identity.issue("ada").await,
            Err(IdentityError::UsernameTaken(name)) if name == "ada"
        ));
    }
}
