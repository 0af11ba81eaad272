//! Listing, authoring and like handlers.

use axum::Json;
use axum::extract::{Extension, FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use postline_api_types::{CreatePostRequest, LikeResponse, PostListResponse, PostView};

use super::QueryPairs;

use crate::application::identity::Caller;
use crate::application::listing::{ListingParams, ListingShape};
use crate::application::media::MediaUpload;
use crate::application::posts::NewPostCommand;
use crate::domain::posts::PostDraft;
use crate::domain::tags;
use crate::domain::types::Visibility;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{listing_response, post_view};
use crate::infra::http::api::state::ApiState;

const SOURCE: &str = "infra::http::api::posts";
const MEDIA_FIELD: &str = "media";

pub async fn list_posts(
    State(state): State<ApiState>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<PostListResponse>, ApiError> {
    list(&state, pairs, ListingShape::Member).await
}

pub async fn list_public_posts(
    State(state): State<ApiState>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<PostListResponse>, ApiError> {
    list(&state, pairs, ListingShape::Public).await
}

pub async fn list_author_posts(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<PostListResponse>, ApiError> {
    list(&state, pairs, ListingShape::Author(user_id)).await
}

async fn list(
    state: &ApiState,
    pairs: QueryPairs,
    shape: ListingShape,
) -> Result<Json<PostListResponse>, ApiError> {
    let params = ListingParams::from_pairs(pairs);
    let listing = state
        .posts
        .list(&params, shape)
        .await
        .map_err(|err| ApiError::from_post_service(SOURCE, err))?;

    Ok(Json(listing_response(listing)))
}

/// Accepts either a JSON body or a multipart form with an optional `media` file.
pub async fn create_post(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    request: Request,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let (draft, media) = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|rejection| {
                ApiError::new(SOURCE, rejection.status(), rejection.body_text())
            })?;
        read_multipart(multipart).await?
    } else {
        let Json(body) = Json::<CreatePostRequest>::from_request(request, &state)
            .await
            .map_err(|rejection| {
                ApiError::bad_request(SOURCE, format!("Invalid JSON body: {}", rejection.body_text()))
            })?;
        (draft_from_json(body), None)
    };

    let entry = state
        .posts
        .create(NewPostCommand {
            author_id: caller.user_id,
            draft,
            media,
        })
        .await
        .map_err(|err| ApiError::from_post_service(SOURCE, err))?;

    Ok((StatusCode::CREATED, Json(post_view(entry))))
}

pub async fn like_post(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<LikeResponse>, ApiError> {
    let likes_count = state
        .posts
        .like(id)
        .await
        .map_err(|err| ApiError::from_post_service(SOURCE, err))?;

    Ok(Json(LikeResponse {
        message: "Post liked successfully".to_string(),
        likes_count,
    }))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

fn draft_from_json(body: CreatePostRequest) -> PostDraft {
    PostDraft {
        title: body.title,
        body: body.content,
        category: body.category,
        tags: body.tags,
        visibility: body.visibility,
    }
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(PostDraft, Option<MediaUpload>), ApiError> {
    let mut draft = PostDraft::default();
    let mut media = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == MEDIA_FIELD {
            let file_name = field
                .file_name()
                .map(str::to_string)
                .filter(|value| !value.is_empty());
            let data = field.bytes().await.map_err(multipart_error)?;
            // Browsers submit an empty, unnamed part when no file was chosen.
            if let Some(file_name) = file_name {
                media = Some(MediaUpload { file_name, data });
            }
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "title" => draft.title = Some(value),
            "content" => draft.body = Some(value),
            "category" => draft.category = Some(value),
            "tags" => draft.tags.extend(tags::parse_list(&value)),
            "visibility" if !value.trim().is_empty() => {
                let visibility = value.parse::<Visibility>().map_err(|err| {
                    ApiError::bad_request(SOURCE, err.to_string())
                })?;
                draft.visibility = Some(visibility);
            }
            _ => {}
        }
    }

    Ok((draft, media))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::new(SOURCE, err.status(), err.body_text())
}
