/// Health check endpoint
///
/// Reports whether the server is up and whether the datastore and the task
/// broker answer. Always `200`; a failed dependency shows up as
/// `"status": "degraded"`.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "queue": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Datastore status
    pub database: String,

    /// Task broker status
    pub queue: String,
}

fn connectivity(ok: bool) -> &'static str {
    if ok {
        "connected"
    } else {
        "disconnected"
    }
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let (database, queue) = tokio::join!(state.users.ping(), state.queue.ping());

    if let Err(e) = &database {
        tracing::warn!(error = %e, "Health check: datastore unreachable");
    }
    if let Err(e) = &queue {
        tracing::warn!(error = %e, "Health check: task queue unreachable");
    }

    let healthy = database.is_ok() && queue.is_ok();

    Ok(Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: connectivity(database.is_ok()).to_string(),
        queue: connectivity(queue.is_ok()).to_string(),
    }))
}
