/// Task queue channel between the API and the worker
///
/// The producer side calls [`TaskQueue::enqueue`], which hands back a task
/// id as soon as the message is in the broker. Nothing on that path waits
/// for execution. The worker side calls [`TaskQueue::dequeue`] in a loop and
/// reports each result through [`TaskQueue::record_outcome`].
///
/// # Backends
///
/// - [`RedisTaskQueue`]: `LPUSH`/`BRPOP` on a Redis list (FIFO per queue)
/// - [`MemoryTaskQueue`]: `VecDeque` shared inside one process
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use userdir_shared::queue::{MemoryTaskQueue, TaskQueue};
///
/// # async fn example() -> Result<(), userdir_shared::queue::QueueError> {
/// let queue = MemoryTaskQueue::new();
/// let task_id = queue
///     .enqueue("generate_bio", vec![serde_json::json!(1)])
///     .await?;
///
/// let message = queue.dequeue(Duration::from_secs(1)).await?.unwrap();
/// assert_eq!(message.id, task_id);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod message;
pub mod redis_backend;

pub use memory::MemoryTaskQueue;
pub use message::{TaskMessage, TaskOutcome, TaskStatus};
pub use redis_backend::RedisTaskQueue;

use crate::redis::RedisClientError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

/// Task queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Broker unreachable
    #[error("Task queue unavailable: {0}")]
    Unavailable(String),

    /// A broker command exceeded the configured timeout
    #[error("Task queue command timed out after {0:?}")]
    Timeout(Duration),

    /// A message could not be encoded or decoded
    #[error("Invalid task message: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker rejected a command
    #[error("Task queue command failed: {0}")]
    Command(String),
}

impl From<RedisClientError> for QueueError {
    fn from(err: RedisClientError) -> Self {
        match err {
            RedisClientError::CommandError(msg) => QueueError::Command(msg),
            other => QueueError::Unavailable(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        RedisClientError::from(err).into()
    }
}

/// Queue transport used by both the producer and the consumer
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Writes a fully formed message to the queue
    async fn push(&self, message: TaskMessage) -> Result<(), QueueError>;

    /// Enqueues a task and returns its id without waiting for execution
    async fn enqueue(&self, task_name: &str, args: Vec<JsonValue>) -> Result<String, QueueError> {
        let message = TaskMessage::new(task_name, args);
        let task_id = message.id.clone();

        self.push(message).await?;

        tracing::info!(task_id = %task_id, task_name, "Task enqueued");
        Ok(task_id)
    }

    /// Waits up to `wait` for the next message
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn dequeue(&self, wait: Duration) -> Result<Option<TaskMessage>, QueueError>;

    /// Stores the outcome of an executed task
    async fn record_outcome(&self, outcome: &TaskOutcome) -> Result<(), QueueError>;

    /// Number of messages waiting
    async fn pending_count(&self) -> Result<usize, QueueError>;

    /// Checks that the broker answers
    async fn ping(&self) -> Result<(), QueueError>;
}
