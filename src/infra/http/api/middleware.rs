use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::identity::AuthError;

use super::error::ApiError;
use super::state::ApiState;

/// Resolve the bearer token to a [`Caller`](crate::application::identity::Caller)
/// and make it available to handlers as an extension.
pub async fn require_caller(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers().get(header::AUTHORIZATION)) else {
        return ApiError::unauthorized().into_response();
    };

    let caller = match state.identity.authenticate(&token).await {
        Ok(caller) => caller,
        Err(AuthError::Missing) | Err(AuthError::Invalid) => {
            return ApiError::unauthorized().into_response();
        }
        Err(err @ AuthError::Unavailable(_)) => {
            return ApiError::unavailable("infra::http::api::require_caller", &err)
                .into_response();
        }
    };

    request.extensions_mut().insert(caller.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(caller);
    response
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_tokens_only() {
        let header = HeaderValue::from_static("Bearer pl_abc_def");
        assert_eq!(extract_token(Some(&header)).as_deref(), Some("pl_abc_def"));

        let basic = HeaderValue::from_static("Basic Zm9vOmJhcg==");
        assert_eq!(extract_token(Some(&basic)), None);

        let empty = HeaderValue::from_static("Bearer   ");
        assert_eq!(extract_token(Some(&empty)), None);
        assert_eq!(extract_token(None), None);
    }
}
