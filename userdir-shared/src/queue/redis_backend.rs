/// Redis-backed task queue
///
/// # Keys
///
/// ```text
/// userdir:queue:{queue_name}   LIST    LPUSH by producers, BRPOP by workers (FIFO)
/// userdir:result:{task_id}     STRING  JSON TaskOutcome, expires after result_ttl_secs
/// ```
///
/// Producers use the shared auto-reconnecting connection and every command
/// is bounded by `command_timeout_secs`. `BRPOP` runs on a dedicated
/// connection owned by this queue so a blocked pop never delays other
/// commands; the connection is reopened after an IO failure.

use super::{QueueError, TaskMessage, TaskOutcome, TaskQueue};
use crate::redis::RedisClient;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

/// Prefix shared by every key this crate writes
const KEY_PREFIX: &str = "userdir";

/// Default lifetime of a stored outcome (one day)
pub const DEFAULT_RESULT_TTL_SECS: u64 = 86_400;

/// Returns the list key for a named queue
pub fn queue_key(queue_name: &str) -> String {
    format!("{}:queue:{}", KEY_PREFIX, queue_name)
}

/// Returns the key an outcome is stored under
pub fn result_key(task_id: &str) -> String {
    format!("{}:result:{}", KEY_PREFIX, task_id)
}

/// `TaskQueue` over a Redis list
pub struct RedisTaskQueue {
    client: RedisClient,
    queue_key: String,
    result_ttl_secs: u64,
    blocking_conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisTaskQueue {
    /// Creates a queue handle for `queue_name`
    pub fn new(client: RedisClient, queue_name: &str) -> Self {
        Self {
            client,
            queue_key: queue_key(queue_name),
            result_ttl_secs: DEFAULT_RESULT_TTL_SECS,
            blocking_conn: Mutex::new(None),
        }
    }

    /// Stores a failed outcome for a popped payload when it names a task id
    async fn record_undecodable(&self, payload: &str, error: &serde_json::Error) {
        let Some(outcome) =
            TaskOutcome::undecodable(payload, format!("Invalid task message: {}", error))
        else {
            return;
        };

        if let Err(e) = self.record_outcome(&outcome).await {
            tracing::warn!(task_id = %outcome.task_id, error = %e, "Failed to record outcome");
        }
    }

    /// Overrides how long outcomes are kept
    pub fn with_result_ttl(mut self, secs: u64) -> Self {
        self.result_ttl_secs = secs.max(1);
        self
    }

    /// The Redis list this queue reads and writes
    pub fn key(&self) -> &str {
        &self.queue_key
    }

    async fn bounded<T, F>(&self, command: F) -> Result<T, QueueError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        let limit = self.client.config().command_timeout();
        match tokio::time::timeout(limit, command).await {
            Ok(result) => result.map_err(QueueError::from),
            Err(_) => {
                tracing::warn!(timeout = ?limit, queue = %self.queue_key, "Redis command timed out");
                Err(QueueError::Timeout(limit))
            }
        }
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn push(&self, message: TaskMessage) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&message)?;
        let mut conn = self.client.get_connection();

        let depth: i64 = self
            .bounded(
                redis::cmd("LPUSH")
                    .arg(&self.queue_key)
                    .arg(payload)
                    .query_async(&mut conn),
            )
            .await?;

        tracing::debug!(task_id = %message.id, queue = %self.queue_key, depth, "Pushed task");
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<TaskMessage>, QueueError> {
        let mut guard = self.blocking_conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.client.dedicated_connection().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(QueueError::Unavailable("No blocking connection".to_string()));
        };

        // BRPOP treats 0 as "block forever"
        let wait_secs = wait.as_secs().max(1);
        let result: Result<Option<(String, String)>, RedisError> = redis::cmd("BRPOP")
            .arg(&self.queue_key)
            .arg(wait_secs)
            .query_async(conn)
            .await;

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() {
                    *guard = None;
                }
                return Err(e.into());
            }
        };

        drop(guard);

        let Some((_, payload)) = reply else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(message) => Ok(Some(message)),
            Err(e) => {
                tracing::error!(
                    queue = %self.queue_key,
                    payload = %payload,
                    error = %e,
                    "Dropping undecodable task payload"
                );
                self.record_undecodable(&payload, &e).await;
                Err(e.into())
            }
        }
    }

    async fn record_outcome(&self, outcome: &TaskOutcome) -> Result<(), QueueError> {
        let payload = serde_json::to_string(outcome)?;
        let mut conn = self.client.get_connection();

        let _: () = self
            .bounded(
                redis::cmd("SET")
                    .arg(result_key(&outcome.task_id))
                    .arg(payload)
                    .arg("EX")
                    .arg(self.result_ttl_secs)
                    .query_async(&mut conn),
            )
            .await?;

        Ok(())
    }

    async fn pending_count(&self) -> Result<usize, QueueError> {
        let mut conn = self.client.get_connection();
        self.bounded(redis::cmd("LLEN").arg(&self.queue_key).query_async(&mut conn))
            .await
    }

    async fn ping(&self) -> Result<(), QueueError> {
        if self.client.ping().await? {
            Ok(())
        } else {
            Err(QueueError::Unavailable("Unexpected PING reply".to_string()))
        }
    }
}
