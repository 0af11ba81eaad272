pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

/// Assemble the full application router: public and authenticated listing
/// surfaces, authoring and engagement endpoints, and the health check.
pub fn build_router(state: ApiState) -> Router {
    let upload_limit = state.upload_limit_bytes;

    let authenticated = Router::new()
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/api/posts/categories", get(handlers::categories))
        .route("/api/posts/popular-tags", get(handlers::popular_tags))
        .route("/api/posts/{id}/like", post(handlers::like_post))
        .route("/api/users/{user_id}/posts", get(handlers::list_author_posts))
        .route_layer(DefaultBodyLimit::max(upload_limit))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_caller,
        ));

    let public = Router::new()
        .route("/api/public/posts", get(handlers::list_public_posts))
        .route("/api/public/categories", get(handlers::categories))
        .route("/api/public/popular-tags", get(handlers::popular_tags))
        .route("/healthz", get(handlers::healthz));

    authenticated
        .merge(public)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
