use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{error::AppError, models::UserId};

/// Header in which the upstream gateway asserts the authenticated principal
pub const USER_ID_HEADER: &str = "x-user-id";

fn user_from_headers(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(UserId)
}

/// Middleware that rejects requests without a valid principal.
///
/// The parsed [`UserId`] is stored in the request extensions for handlers.
pub async fn require_user(mut request: Request, next: Next) -> Result<Response, AppError> {
    let Some(user) = user_from_headers(request.headers()) else {
        tracing::debug!(uri = %request.uri(), "Rejecting request without a valid user id");
        return Err(AppError::Unauthorized(format!(
            "Missing or invalid {} header",
            USER_ID_HEADER
        )));
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserId>()
            .copied()
            .or_else(|| user_from_headers(&parts.headers))
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

/// Tracing span for a request, tagged with the asserting user when present
pub fn make_span_with_user(request: &Request<Body>) -> tracing::Span {
    let user = user_from_headers(request.headers())
        .map(|u| u.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        user_id = %user,
    )
}
