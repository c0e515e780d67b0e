//! Common test utilities for integration tests
//!
//! Builds the real router over the in-memory store and queue, so the HTTP
//! layer is exercised end to end without PostgreSQL or Redis.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use userdir_api::app::{build_router, AppState};
use userdir_api::config::{ApiConfig, Config};
use userdir_shared::db::pool::DatabaseConfig;
use userdir_shared::queue::{MemoryTaskQueue, TaskOutcome};
use userdir_shared::redis::RedisConfig;
use userdir_shared::store::MemoryUserStore;

/// Test context containing the router and handles on its backends
pub struct TestContext {
    pub app: Router,
    pub users: MemoryUserStore,
    pub queue: MemoryTaskQueue,
}

impl TestContext {
    pub fn new() -> Self {
        let users = MemoryUserStore::new();
        let queue = MemoryTaskQueue::new();

        let state = AppState::new(
            Arc::new(users.clone()),
            Arc::new(queue.clone()),
            test_config(),
        );

        TestContext {
            app: build_router(state),
            users,
            queue,
        }
    }

    /// Sends a request and returns the status and the JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        if body.is_empty() {
            return (status, Value::Null);
        }

        let json = serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!(
                "{} response is not JSON ({}): {}",
                status,
                e,
                String::from_utf8_lossy(&body)
            )
        });
        (status, json)
    }

    /// Sends a request with an optional JSON body
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Sends a raw body with a JSON content type
    pub async fn request_raw(&self, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Creates a user through the API and returns the response body
    pub async fn create_user(&self, username: &str, email: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/users",
                Some(serde_json::json!({ "username": username, "email": email })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body
    }

    /// Number of users the list endpoint returns
    pub async fn user_count(&self) -> usize {
        let (status, body) = self.request("GET", "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().map(Vec::len).unwrap_or_default()
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig::default(),
        database: DatabaseConfig {
            url: "postgresql://localhost/userdir_test".to_string(),
            ..DatabaseConfig::default()
        },
        redis: RedisConfig::local(),
        queue_name: "test".to_string(),
    }
}

/// Waits until the worker has recorded an outcome for `task_id`
pub async fn wait_for_outcome(queue: &MemoryTaskQueue, task_id: &str, timeout_secs: u64) -> TaskOutcome {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(timeout_secs);

    loop {
        if let Some(outcome) = queue.outcome(task_id).await {
            return outcome;
        }

        if tokio::time::Instant::now() > deadline {
            panic!("No outcome for task {} within {} seconds", task_id, timeout_secs);
        }

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
