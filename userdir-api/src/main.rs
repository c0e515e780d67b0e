//! # userdir API Server
//!
//! Serves the user directory over HTTP and enqueues bio generation tasks
//! for the worker.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/userdir REDIS_URL=redis://localhost:6379 \
//!     cargo run -p userdir-api
//! ```

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use userdir_api::{
    app::{build_router, AppState},
    config::Config,
};
use userdir_shared::db::migrations::{get_migration_status, run_migrations};
use userdir_shared::db::pool;
use userdir_shared::queue::RedisTaskQueue;
use userdir_shared::redis::RedisClient;
use userdir_shared::store::PgUserStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("userdir API server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let db = pool::create_pool(config.database.clone()).await?;
    run_migrations(&db).await?;

    let migrations = get_migration_status(&db).await?;
    let pool_stats = pool::get_pool_stats(&db);
    tracing::info!(
        applied_migrations = migrations.applied_migrations,
        latest_version = ?migrations.latest_version,
        connections = pool_stats.total_connections,
        "Database ready"
    );

    tracing::info!("Connecting to Redis...");
    let redis = RedisClient::new(config.redis.clone()).await?;
    let redis_stats = redis.stats().await;
    tracing::info!(url = %redis_stats.url, healthy = redis_stats.healthy, "Redis ready");
    let queue = RedisTaskQueue::new(redis, &config.queue_name);
    tracing::info!(queue = %queue.key(), "Task queue ready");

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(PgUserStore::new(db.clone())), Arc::new(queue), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server shut down");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "userdir_api=debug,userdir_shared=info,tower_http=debug".into());

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

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
