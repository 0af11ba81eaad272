//! Boundary to the media collaborator that owns uploaded assets.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file type `{extension}` is not allowed")]
    UnsupportedType { extension: String },
    #[error("file exceeds the {limit_bytes} byte limit")]
    TooLarge { limit_bytes: u64 },
    #[error("uploaded file is empty")]
    Empty,
    #[error("media reference `{0}` does not belong to this store")]
    UnknownReference(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Whether the error was caused by the submitted file rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MediaError::UnsupportedType { .. } | MediaError::TooLarge { .. } | MediaError::Empty
        )
    }
}

/// A file attached to a create request.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub data: Bytes,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist an upload for `owner_id` and return the URL to reference it by.
    async fn store(&self, owner_id: i64, upload: MediaUpload) -> Result<String, MediaError>;

    /// Remove an asset previously returned by [`MediaStore::store`].
    async fn discard(&self, media_url: &str) -> Result<(), MediaError>;
}
