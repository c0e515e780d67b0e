/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: User CRUD endpoints
/// - `bio`: Bio generation trigger

pub mod bio;
pub mod health;
pub mod users;

use crate::error::ApiError;

/// Fallback for paths no route matches
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
