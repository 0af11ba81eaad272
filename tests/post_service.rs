use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;

use postline::application::media::{MediaStore, MediaUpload};
use postline::application::posts::{NewPostCommand, PostService, PostServiceError};
use postline::application::repos::{
    CounterDelta, CreatePostParams, PostsRepo, PostsWriteRepo, RepoError,
};
use postline::cache::{AggregateStore, AggregateViews, CacheConfig, CacheTrigger};
use postline::domain::entities::{Counters, PostRecord};
use postline::domain::posts::PostDraft;
use postline::infra::memory::MemoryRepositories;
use postline::infra::uploads::MediaStorage;

/// Delegates to the memory store until inserts are switched off.
struct FlakyWriter {
    inner: Arc<MemoryRepositories>,
    fail_inserts: AtomicBool,
}

#[async_trait]
impl PostsWriteRepo for FlakyWriter {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection reset".into()));
        }
        self.inner.create_post(params).await
    }

    async fn increment_counters(
        &self,
        id: i64,
        delta: CounterDelta,
    ) -> Result<Counters, RepoError> {
        self.inner.increment_counters(id, delta).await
    }

    async fn record_views(&self, ids: &[i64]) -> Result<Vec<(i64, u64)>, RepoError> {
        self.inner.record_views(ids).await
    }
}

struct Fixture {
    service: PostService,
    writer: Arc<FlakyWriter>,
    media: Arc<MediaStorage>,
    uploads: TempDir,
}

fn fixture() -> Fixture {
    let uploads = TempDir::new().expect("tempdir");
    let media = Arc::new(
        MediaStorage::new(uploads.path().to_path_buf(), "/static/uploads", 1024 * 1024)
            .expect("media storage"),
    );
    let repos = Arc::new(MemoryRepositories::new());
    let writer = Arc::new(FlakyWriter {
        inner: repos.clone(),
        fail_inserts: AtomicBool::new(false),
    });

    let config = CacheConfig::default();
    let store = Arc::new(AggregateStore::new(&config));
    let reader: Arc<dyn PostsRepo> = repos.clone();
    let aggregates = Arc::new(AggregateViews::new(config.clone(), store.clone(), reader.clone()));
    let trigger = Arc::new(CacheTrigger::new(config, store));

    let service = PostService::new(
        reader,
        writer.clone(),
        repos,
        media.clone(),
        aggregates,
        trigger,
    );

    Fixture {
        service,
        writer,
        media,
        uploads,
    }
}

fn command_with_photo() -> NewPostCommand {
    NewPostCommand {
        author_id: 1,
        draft: PostDraft {
            title: Some("Beach".into()),
            body: Some("sand".into()),
            ..Default::default()
        },
        media: Some(MediaUpload {
            file_name: "photo.png".into(),
            data: Bytes::from_static(b"\x89PNG identical bytes"),
        }),
    }
}

fn stored_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).expect("read uploads").count()
}

#[tokio::test]
async fn failed_insert_discards_only_its_own_upload() {
    let fx = fixture();

    let first = fx
        .service
        .create(command_with_photo())
        .await
        .expect("first create");
    let first_url = first.record.media_url.clone().expect("media url");
    assert_eq!(stored_files(&fx.uploads), 1);

    fx.writer.fail_inserts.store(true, Ordering::SeqCst);
    let err = fx
        .service
        .create(command_with_photo())
        .await
        .expect_err("insert fails");
    assert!(matches!(err, PostServiceError::Repo(RepoError::Persistence(_))));

    // The aborted upload is gone; the committed post's file is untouched.
    assert_eq!(stored_files(&fx.uploads), 1);
    let stored_name = first_url
        .rsplit('/')
        .next()
        .expect("file name");
    assert!(fx.uploads.path().join(stored_name).exists());

    fx.media.discard(&first_url).await.expect("discard");
    assert_eq!(stored_files(&fx.uploads), 0);
}

#[tokio::test]
async fn failed_insert_leaves_no_post_behind() {
    let fx = fixture();
    fx.writer.fail_inserts.store(true, Ordering::SeqCst);

    fx.service
        .create(command_with_photo())
        .await
        .expect_err("insert fails");

    assert_eq!(stored_files(&fx.uploads), 0);
    let categories = fx.service.categories().await.expect("categories");
    assert!(categories.is_empty());
}
