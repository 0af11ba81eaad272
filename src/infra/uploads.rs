//! Filesystem media storage for files attached to new posts.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use slug::slugify;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use crate::application::media::{MediaError, MediaStore, MediaUpload};
use crate::config::UploadSettings;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "mp4", "mov"];
const DIGEST_PREFIX_LEN: usize = 16;
/// Keeps stored names, and the URLs built from them, well inside `media_url VARCHAR(255)`.
const STEM_MAX_CHARS: usize = 64;

/// Stores uploads under a root directory and serves them from a public prefix.
#[derive(Debug)]
pub struct MediaStorage {
    root: PathBuf,
    public_prefix: String,
    max_bytes: u64,
}

impl MediaStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(
        root: PathBuf,
        public_prefix: impl Into<String>,
        max_bytes: u64,
    ) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        let public_prefix = public_prefix.into().trim_end_matches('/').to_string();
        Ok(Self {
            root,
            public_prefix,
            max_bytes,
        })
    }

    pub fn from_settings(settings: &UploadSettings) -> Result<Self, std::io::Error> {
        Self::new(
            settings.directory.clone(),
            settings.public_prefix.clone(),
            settings.max_request_bytes.get(),
        )
    }

    /// Every call yields a fresh name, so discarding one upload never removes a
    /// file another post references.
    fn stored_name(owner_id: i64, file_name: &str, extension: &str, data: &[u8]) -> String {
        let digest = hex::encode(Sha256::digest(data));
        let identifier = Uuid::new_v4().simple();
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|value| value.to_str())
            .map(bounded_slug)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "upload".to_string());
        format!(
            "{owner_id}-{}-{identifier}-{stem}.{extension}",
            &digest[..DIGEST_PREFIX_LEN]
        )
    }

    /// Map a URL handed out by [`MediaStore::store`] back to a path under the root.
    fn resolve_url(&self, media_url: &str) -> Result<PathBuf, MediaError> {
        let relative = media_url
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| MediaError::UnknownReference(media_url.to_string()))?;

        let path = Path::new(relative);
        if relative.is_empty()
            || path.is_absolute()
            || path.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(MediaError::UnknownReference(media_url.to_string()));
        }

        Ok(self.root.join(path))
    }
}

fn bounded_slug(stem: &str) -> String {
    let slug = slugify(stem);
    // slugify output is ASCII, so byte and char lengths agree.
    match slug.get(..STEM_MAX_CHARS) {
        Some(prefix) if slug.len() > STEM_MAX_CHARS => prefix.trim_end_matches('-').to_string(),
        _ => slug,
    }
}

/// Lower-cased extension of `file_name`, if it is one of the accepted media types.
fn media_extension(file_name: &str) -> Result<String, MediaError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .unwrap_or_default();

    let is_media = mime_guess::from_ext(&extension)
        .first()
        .is_some_and(|mime| matches!(mime.type_().as_str(), "image" | "video"));
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) || !is_media {
        return Err(MediaError::UnsupportedType { extension });
    }
    Ok(extension)
}

#[async_trait]
impl MediaStore for MediaStorage {
    async fn store(&self, owner_id: i64, upload: MediaUpload) -> Result<String, MediaError> {
        let extension = media_extension(&upload.file_name)?;
        if upload.data.is_empty() {
            return Err(MediaError::Empty);
        }
        if upload.data.len() as u64 > self.max_bytes {
            return Err(MediaError::TooLarge {
                limit_bytes: self.max_bytes,
            });
        }

        let name = Self::stored_name(owner_id, &upload.file_name, &extension, &upload.data);
        let absolute = self.root.join(&name);
        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&upload.data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        debug!(
            target: "postline::infra::uploads",
            owner_id,
            stored = %name,
            size_bytes = upload.data.len(),
            "Media stored"
        );
        Ok(format!("{}/{name}", self.public_prefix))
    }

    /// Missing files are treated as success.
    async fn discard(&self, media_url: &str) -> Result<(), MediaError> {
        let absolute = self.resolve_url(media_url)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MediaError::Io(err)),
        }
    }
}
