use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use postline_api_types::ErrorResponse;

use crate::application::error::ErrorReport;
use crate::application::media::MediaError;
use crate::application::posts::PostServiceError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

/// An error response: a `{ "message": ... }` body plus the diagnostic chain
/// handed to the response logger.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(source: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let report = ErrorReport::from_message(source, status, message.clone());
        Self {
            status,
            message,
            report,
        }
    }

    /// Public message for the client, full error chain for the logs.
    fn with_source(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn bad_request(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            "infra::http::api::auth",
            StatusCode::UNAUTHORIZED,
            "Missing or invalid bearer token",
        )
    }

    pub fn not_found(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(source: &'static str, error: &dyn StdError) -> Self {
        Self::with_source(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            error,
        )
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::with_source(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn from_repo(source: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::Timeout => Self::unavailable(source, &err),
            RepoError::NotFound => Self::not_found(source, "Resource not found"),
            RepoError::InvalidInput { ref message } => {
                Self::with_source(source, StatusCode::BAD_REQUEST, message.clone(), &err)
            }
            RepoError::Duplicate { .. }
            | RepoError::Integrity { .. }
            | RepoError::Persistence(_) => Self::internal(source, &err),
        }
    }

    pub fn from_post_service(source: &'static str, err: PostServiceError) -> Self {
        match err {
            PostServiceError::Validation(inner) => Self::from_domain(source, inner),
            PostServiceError::Media(inner) => Self::from_media(source, inner),
            PostServiceError::NotFound(_) => Self::not_found(source, "Post not found"),
            PostServiceError::Repo(inner) => Self::from_repo(source, inner),
        }
    }

    fn from_domain(source: &'static str, err: DomainError) -> Self {
        let message = match &err {
            DomainError::MissingField { .. } => "Title and content are required".to_string(),
            other => other.to_string(),
        };
        Self::with_source(source, StatusCode::BAD_REQUEST, message, &err)
    }

    fn from_media(source: &'static str, err: MediaError) -> Self {
        if !err.is_client_error() {
            return Self::internal(source, &err);
        }
        let message = match &err {
            MediaError::UnsupportedType { .. } => "Invalid file type".to_string(),
            MediaError::TooLarge { limit_bytes } => {
                format!("File size exceeds the {}MB limit", limit_bytes / (1024 * 1024))
            }
            _ => "Uploaded file is empty".to_string(),
        };
        Self::with_source(source, StatusCode::BAD_REQUEST, message, &err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            message: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_a_single_message() {
        let err = ApiError::from_post_service(
            "test",
            PostServiceError::Validation(DomainError::missing("title")),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Title and content are required");
    }

    #[test]
    fn storage_detail_stays_out_of_the_body() {
        let err = ApiError::from_repo(
            "test",
            RepoError::Persistence("connection reset by peer".into()),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");
        assert!(
            err.report
                .messages
                .iter()
                .any(|message| message.contains("connection reset"))
        );
    }

    #[test]
    fn timeouts_map_to_unavailable() {
        let err = ApiError::from_repo("test", RepoError::Timeout);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn media_limits_are_reported_in_megabytes() {
        let err = ApiError::from_post_service(
            "test",
            PostServiceError::Media(MediaError::TooLarge {
                limit_bytes: 16 * 1024 * 1024,
            }),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "File size exceeds the 16MB limit");
    }

    #[test]
    fn store_side_media_failures_are_internal() {
        let err = ApiError::from_post_service(
            "test",
            PostServiceError::Media(MediaError::Io(std::io::Error::other("disk full"))),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");

        let err = ApiError::from_post_service("test", PostServiceError::Media(MediaError::Empty));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Uploaded file is empty");
    }

    #[test]
    fn unknown_post_is_not_found() {
        let err = ApiError::from_post_service("test", PostServiceError::NotFound(9));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Post not found");
    }
}
