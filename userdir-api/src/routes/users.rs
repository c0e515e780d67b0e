/// User resource endpoints
///
/// # Endpoints
///
/// - `GET /users` - List users in id order
/// - `POST /users` - Create a user
/// - `GET /users/:id` - Fetch one user
/// - `PUT /users/:id` - Partially update a user
/// - `DELETE /users/:id` - Delete a user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{JsonBody, UserId},
    validation::{validate_create, validate_partial, UserPayload},
};
use axum::{extract::State, http::StatusCode, Json};
use userdir_shared::models::user::User;

/// List all users
///
/// # Response
///
/// ```json
/// [{"id": 1, "username": "alice", "email": "alice@example.com"}]
/// ```
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let users = state.users.list().await?;
    tracing::debug!(count = users.len(), "Listed users");
    Ok(Json(users))
}

/// Create a user
///
/// # Request
///
/// ```text
/// POST /users
/// Content-Type: application/json
///
/// {"username": "alice", "email": "alice@example.com"}
/// ```
///
/// # Errors
///
/// - `400 validation_error`: a field is missing or malformed
/// - `400 duplicate_key`: username or email already taken
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UserPayload>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let new_user = validate_create(payload).map_err(ApiError::ValidationError)?;

    let user = state.users.create(new_user).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to create user");
        ApiError::from(e)
    })?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Fetch a user by id
pub async fn get_user(State(state): State<AppState>, UserId(id): UserId) -> ApiResult<Json<User>> {
    Ok(Json(state.users.get(id).await?))
}

/// Partially update a user
///
/// Absent fields keep their value. The user must exist before the body is
/// parsed or validated, so an unknown id is a 404 even when the body is
/// malformed too.
pub async fn update_user(
    State(state): State<AppState>,
    UserId(id): UserId,
    body: Result<JsonBody<UserPayload>, ApiError>,
) -> ApiResult<Json<User>> {
    let current = state.users.get(id).await?;

    let JsonBody(payload) = body?;
    let changes = validate_partial(payload).map_err(ApiError::ValidationError)?;
    if changes.is_empty() {
        return Ok(Json(current));
    }

    let user = state.users.update(id, changes).await?;

    tracing::info!(user_id = id, "User updated");
    Ok(Json(user))
}

/// Delete a user
pub async fn delete_user(State(state): State<AppState>, UserId(id): UserId) -> ApiResult<StatusCode> {
    state.users.delete(id).await?;

    tracing::info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
