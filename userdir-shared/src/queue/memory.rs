/// In-process task queue
///
/// FIFO over a `VecDeque`, with a `Notify` to wake a waiting consumer. Both
/// ends must live in the same process, so this backend serves tests and
/// single-binary setups; clones share the same queue.

use super::{QueueError, TaskMessage, TaskOutcome, TaskQueue};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

#[derive(Debug, Default)]
struct MemoryQueueState {
    pending: VecDeque<TaskMessage>,
    outcomes: HashMap<String, TaskOutcome>,
}

/// `TaskQueue` backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskQueue {
    state: Arc<Mutex<MemoryQueueState>>,
    notify: Arc<Notify>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages still waiting, oldest first
    pub async fn pending(&self) -> Vec<TaskMessage> {
        self.state.lock().await.pending.iter().cloned().collect()
    }

    /// Outcome recorded for a task, if any
    pub async fn outcome(&self, task_id: &str) -> Option<TaskOutcome> {
        self.state.lock().await.outcomes.get(task_id).cloned()
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn push(&self, message: TaskMessage) -> Result<(), QueueError> {
        self.state.lock().await.pending.push_back(message);
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<TaskMessage>, QueueError> {
        let deadline = Instant::now() + wait;

        loop {
            if let Some(message) = self.state.lock().await.pending.pop_front() {
                return Ok(Some(message));
            }

            // notify_one leaves a permit when nobody is waiting, so a push that
            // lands between the check above and this await is not lost.
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn record_outcome(&self, outcome: &TaskOutcome) -> Result<(), QueueError> {
        self.state
            .lock()
            .await
            .outcomes
            .insert(outcome.task_id.clone(), outcome.clone());
        Ok(())
    }

    async fn pending_count(&self) -> Result<usize, QueueError> {
        Ok(self.state.lock().await.pending.len())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_enqueue_returns_id_of_pushed_message() {
        let queue = MemoryTaskQueue::new();
        let task_id = queue.enqueue("generate_bio", vec![json!(3)]).await.unwrap();

        let pending = queue.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, task_id);
        assert_eq!(pending[0].args, vec![json!(3)]);
    }

    #[tokio::test]
    async fn test_dequeue_is_fifo() {
        let queue = MemoryTaskQueue::new();
        let first = queue.enqueue("a", vec![]).await.unwrap();
        let second = queue.enqueue("b", vec![]).await.unwrap();

        let wait = Duration::from_millis(10);
        assert_eq!(queue.dequeue(wait).await.unwrap().unwrap().id, first);
        assert_eq!(queue.dequeue(wait).await.unwrap().unwrap().id, second);
        assert!(queue.dequeue(wait).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dequeue_times_out_when_empty() {
        let queue = MemoryTaskQueue::new();
        let result = queue.dequeue(Duration::from_secs(5)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_push() {
        let queue = MemoryTaskQueue::new();
        let consumer = queue.clone();
        let handle =
            tokio::spawn(async move { consumer.dequeue(Duration::from_secs(5)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let task_id = queue.enqueue("generate_bio", vec![]).await.unwrap();

        let message = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(message.id, task_id);
        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_outcome() {
        let queue = MemoryTaskQueue::new();
        let message = TaskMessage::new("generate_bio", vec![]);
        let outcome = TaskOutcome::succeeded(&message, json!("done"));

        queue.record_outcome(&outcome).await.unwrap();
        assert_eq!(queue.outcome(&message.id).await, Some(outcome));
        assert!(queue.outcome("missing").await.is_none());
    }
}
