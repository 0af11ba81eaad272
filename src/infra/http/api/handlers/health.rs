use axum::extract::State;
use axum::response::Response;

use crate::infra::http::api::state::ApiState;
use crate::infra::http::store_health_response;

pub async fn healthz(State(state): State<ApiState>) -> Response {
    store_health_response(state.posts.health().await)
}
