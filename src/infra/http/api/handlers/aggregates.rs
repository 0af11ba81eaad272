//! Category and popular-tag views. Served on both the public and the
//! authenticated surface with identical payloads.

use axum::Json;
use axum::extract::{Query, State};
use postline_api_types::{CategoriesResponse, PopularTagsResponse};

use super::{QueryPairs, first_value};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::tag_count_view;
use crate::infra::http::api::state::ApiState;

const SOURCE: &str = "infra::http::api::aggregates";

pub async fn categories(
    State(state): State<ApiState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = state
        .posts
        .categories()
        .await
        .map_err(|err| ApiError::from_post_service(SOURCE, err))?;

    Ok(Json(CategoriesResponse { categories }))
}

pub async fn popular_tags(
    State(state): State<ApiState>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<PopularTagsResponse>, ApiError> {
    let ranked = state
        .posts
        .popular_tags(first_value(&pairs, "limit"))
        .await
        .map_err(|err| ApiError::from_post_service(SOURCE, err))?;

    Ok(Json(PopularTagsResponse {
        tags: ranked.into_iter().map(tag_count_view).collect(),
    }))
}
