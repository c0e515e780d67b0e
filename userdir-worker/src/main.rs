//! # userdir Worker
//!
//! Long-running process that pulls tasks from the Redis queue and executes
//! them.
//!
//! ## Usage
//!
//! ```bash
//! REDIS_URL=redis://localhost:6379 cargo run -p userdir-worker
//! ```

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use userdir_shared::queue::{RedisTaskQueue, TaskQueue};
use userdir_shared::redis::{RedisClient, RedisConfig};
use userdir_worker::config::WorkerConfig;
use userdir_worker::handlers::HandlerRegistry;
use userdir_worker::orchestrator::WorkerOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("userdir worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env()?;
    let redis_config = RedisConfig::from_env()?;

    tracing::info!("Connecting to Redis...");
    let redis = RedisClient::new(redis_config).await?;
    let redis_stats = redis.stats().await;
    tracing::info!(url = %redis_stats.url, healthy = redis_stats.healthy, "Redis ready");

    let queue = RedisTaskQueue::new(redis, &config.queue_name).with_result_ttl(config.result_ttl_secs);
    let pending = queue.pending_count().await?;
    tracing::info!(queue = %queue.key(), pending, "Task queue ready");

    let orchestrator = WorkerOrchestrator::new(Arc::new(queue), HandlerRegistry::with_defaults(), config);

    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });

    orchestrator.run().await
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "userdir_worker=debug,userdir_shared=info".into());

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
