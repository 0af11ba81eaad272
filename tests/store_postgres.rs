//! Postgres repository behaviour.
//!
//! - Needs `DATABASE_URL` pointing at a server the test user may create databases on.
//! - Marked `#[ignore]`; run with `cargo test --test store_postgres -- --ignored`.

use postline::application::repos::{
    AuthorsRepo, CounterDelta, CreatePostParams, CreateUserParams, PostOrder, PostQueryFilter,
    PostsRepo, PostsWriteRepo, RepoError, SortField, SortOrder, UsersRepo,
};
use postline::domain::types::Visibility;
use postline::infra::db::PostgresRepositories;
use sqlx::PgPool;

fn params(title: &str, category: &str, tags: &[&str], visibility: Visibility) -> CreatePostParams {
    CreatePostParams {
        title: title.to_string(),
        body: format!("{title} body"),
        media_url: None,
        author_id: 1,
        category: Some(category.to_string()),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        visibility,
    }
}

async fn seed(repos: &PostgresRepositories) -> Vec<i64> {
    let mut ids = Vec::new();
    for post in [
        params("Python APIs", "programming", &["python", "api"], Visibility::Public),
        params("Rust 100% safe", "programming", &["rust"], Visibility::Public),
        params("Garden log", "life", &[], Visibility::Private),
        params("Weekend", "", &["life"], Visibility::Public),
    ] {
        ids.push(repos.create_post(post).await.expect("create post").id);
    }
    ids
}

fn filter() -> PostQueryFilter {
    PostQueryFilter::default()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn query_filters_and_counts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let ids = seed(&repos).await;

    let page = repos
        .query_posts(
            &PostQueryFilter {
                visibility: Some(Visibility::Public),
                ..filter()
            },
            PostOrder::default(),
            0,
            2,
        )
        .await
        .expect("query");
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);

    let page = repos
        .query_posts(
            &PostQueryFilter {
                search: Some("100%".into()),
                ..filter()
            },
            PostOrder::default(),
            0,
            10,
        )
        .await
        .expect("query");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, ids[1]);

    let page = repos
        .query_posts(
            &PostQueryFilter {
                search: Some("PYTHON".into()),
                ..filter()
            },
            PostOrder::default(),
            0,
            10,
        )
        .await
        .expect("query");
    assert_eq!(page.items[0].id, ids[0]);

    let page = repos
        .query_posts(
            &PostQueryFilter {
                tags: vec!["api".into(), "life".into()],
                ..filter()
            },
            PostOrder {
                field: SortField::Title,
                order: SortOrder::Asc,
            },
            0,
            10,
        )
        .await
        .expect("query");
    let found: Vec<i64> = page.items.iter().map(|post| post.id).collect();
    assert_eq!(found, vec![ids[0], ids[3]]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn ties_break_on_id(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let ids = seed(&repos).await;

    let page = repos
        .query_posts(
            &filter(),
            PostOrder {
                field: SortField::LikesCount,
                order: SortOrder::Desc,
            },
            0,
            10,
        )
        .await
        .expect("query");
    let found: Vec<i64> = page.items.iter().map(|post| post.id).collect();
    assert_eq!(found, ids);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn corrupt_tags_decode_as_empty(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let ids = seed(&repos).await;

    sqlx::query("UPDATE posts SET tags = '{oops' WHERE id = $1")
        .bind(ids[0])
        .execute(&pool)
        .await
        .expect("corrupt tags");
    sqlx::query("UPDATE posts SET tags = '[1, 2]' WHERE id = $1")
        .bind(ids[1])
        .execute(&pool)
        .await
        .expect("non-string tags");

    let post = repos
        .find_post_by_id(ids[0])
        .await
        .expect("find")
        .expect("exists");
    assert!(post.tags.is_empty());

    let sequences = repos.list_tag_sequences().await.expect("tags");
    assert!(sequences.iter().flatten().all(|tag| tag == "life"));

    let page = repos
        .query_posts(
            &PostQueryFilter {
                tags: vec!["python".into()],
                ..filter()
            },
            PostOrder::default(),
            0,
            10,
        )
        .await
        .expect("query");
    assert_eq!(page.total, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn categories_are_distinct_and_sorted(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    seed(&repos).await;

    let categories = repos.list_categories().await.expect("categories");
    assert_eq!(categories, vec!["life", "programming"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn counters_increment_atomically(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let ids = seed(&repos).await;

    repos
        .increment_counters(ids[0], CounterDelta::like())
        .await
        .expect("like");
    let counters = repos
        .increment_counters(ids[0], CounterDelta::like())
        .await
        .expect("like");
    assert_eq!(counters.likes, 2);

    let views = repos.record_views(&[ids[0], ids[1], 9_999]).await.expect("views");
    assert_eq!(views.len(), 2);
    assert!(views.contains(&(ids[0], 1)));

    assert!(matches!(
        repos.increment_counters(9_999, CounterDelta::like()).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn users_resolve_by_prefix_and_name(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    let user = repos
        .create_user(CreateUserParams {
            username: "ada".into(),
            token_prefix: "abc123def456".into(),
            token_hash: vec![1, 2, 3],
        })
        .await
        .expect("create user");

    let credential = repos
        .find_credential_by_prefix("abc123def456")
        .await
        .expect("lookup")
        .expect("credential");
    assert_eq!(credential.user.id, user.id);
    assert_eq!(credential.token_hash, vec![1, 2, 3]);

    let names = repos.display_names(&[user.id, 404]).await.expect("names");
    assert_eq!(names.get(&user.id).map(String::as_str), Some("ada"));
    assert!(!names.contains_key(&404));

    let duplicate = repos
        .create_user(CreateUserParams {
            username: "ada".into(),
            token_prefix: "fff000fff000".into(),
            token_hash: vec![9],
        })
        .await;
    assert!(matches!(duplicate, Err(RepoError::Duplicate { .. })));
}
