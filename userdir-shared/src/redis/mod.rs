/// Redis integration
///
/// Redis is the broker between the API and the worker: the task queue
/// (`crate::queue::RedisTaskQueue`) pushes and pops task messages on a list
/// and stores task outcomes under expiring keys.
///
/// ```text
/// ┌─────────────┐  LPUSH userdir:queue:{name}   ┌─────────────┐
/// │     API     │ ────────────────────────────> │    Redis    │
/// └─────────────┘                               └─────────────┘
///                                                   │  BRPOP
///                                                   ▼
///                                             ┌─────────────┐
///                                             │   Worker    │ ──SET EX──> userdir:result:{task_id}
///                                             └─────────────┘
/// ```
///
/// # Example
///
/// ```no_run
/// use userdir_shared::redis::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = RedisConfig::from_env()?;
/// let client = RedisClient::new(config).await?;
/// println!("Redis healthy: {}", client.ping().await?);
/// # Ok(())
/// # }
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig, RedisStats};
