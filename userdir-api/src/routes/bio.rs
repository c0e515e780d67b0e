/// Bio generation trigger
///
/// # Endpoint
///
/// ```text
/// POST /users/:id/generate-bio
/// Content-Type: application/json
///
/// {"keywords": ["rust", "databases"]}      (optional)
/// ```
///
/// # Response
///
/// ```json
/// {
///   "message": "Bio generation started.",
///   "task_id": "3f0c1c9e-5c7e-4a55-9d4b-2f1a8f0b2f77"
/// }
/// ```
///
/// The handler only enqueues; the worker runs the task later. The response
/// status is `202 Accepted` and the `task_id` is the id the queue assigned.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::UserId,
    validation::{validate_bio_request, BioRequest},
};
use axum::{extract::State, http::StatusCode, Json};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use userdir_shared::tasks::{GenerateBio, GENERATE_BIO};

pub const BIO_STARTED_MESSAGE: &str = "Bio generation started.";

/// Bio trigger response
#[derive(Debug, Serialize, Deserialize)]
pub struct BioTaskResponse {
    pub message: String,
    pub task_id: String,
}

/// Enqueue bio generation for a user
///
/// # Errors
///
/// - `404 not_found`: no such user
/// - `400`: body present but not valid JSON, or keywords out of bounds
/// - `503 service_unavailable`: broker unreachable
pub async fn generate_bio(
    State(state): State<AppState>,
    UserId(id): UserId,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<BioTaskResponse>)> {
    state.users.get(id).await?;

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        BioRequest::default()
    } else {
        serde_json::from_slice::<BioRequest>(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
    };
    let task = match validate_bio_request(request).map_err(ApiError::ValidationError)? {
        Some(keywords) => GenerateBio::new(id, keywords),
        None => GenerateBio::with_default_keywords(id),
    };

    let task_id = state.queue.enqueue(GENERATE_BIO, task.into_args()).await?;

    tracing::info!(user_id = id, task_id = %task_id, "Bio generation enqueued");

    Ok((
        StatusCode::ACCEPTED,
        Json(BioTaskResponse {
            message: BIO_STARTED_MESSAGE.to_string(),
            task_id,
        }),
    ))
}
