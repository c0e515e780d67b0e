/// Request extractors with `ApiError` rejections
///
/// axum's stock `Json` and `Path` extractors reject with plain-text bodies.
/// These wrappers keep every rejection in the `{error, message}` shape.

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path},
    http::request::Parts,
};

/// `Json<T>` that rejects malformed bodies with `400 bad_request`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// User id taken from the `:id` path segment
///
/// A segment that is not an integer cannot name a user, so it is rejected
/// with `404 not_found`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::InternalError(format!("Path extraction failed: {}", e)))?;

        raw.parse::<i64>().map(UserId).map_err(|_| {
            tracing::debug!(id = %raw, "Path id is not an integer");
            ApiError::NotFound("User not found".to_string())
        })
    }
}
