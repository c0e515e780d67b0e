/// Worker orchestrator
///
/// The main worker loop. It pulls messages from the task queue, dispatches
/// each one to the handler registered for its name, and records the outcome.
///
/// # Architecture
///
/// ```text
/// Orchestrator
///   ├─> Semaphore: wait for a free execution slot
///   ├─> TaskQueue: dequeue (blocks up to poll interval)
///   ├─> HandlerRegistry: look up handler by task name
///   ├─> TaskHandler: execute in its own Tokio task
///   └─> TaskQueue: record outcome
/// ```
///
/// # Failure handling
///
/// An unknown task name, invalid arguments, a handler error or a handler
/// panic all end with a `failed` outcome. None of them stop the loop.
/// Tasks are not retried.
///
/// # Shutdown
///
/// Cancelling the shutdown token stops dequeuing after the current poll.
/// In-flight tasks then get up to `shutdown_grace_secs` to finish.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use userdir_shared::queue::MemoryTaskQueue;
/// use userdir_worker::config::WorkerConfig;
/// use userdir_worker::handlers::HandlerRegistry;
/// use userdir_worker::orchestrator::WorkerOrchestrator;
///
/// # async fn example() -> anyhow::Result<()> {
/// let orchestrator = WorkerOrchestrator::new(
///     Arc::new(MemoryTaskQueue::new()),
///     HandlerRegistry::with_defaults(),
///     WorkerConfig::default(),
/// );
///
/// let token = orchestrator.shutdown_token();
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     token.cancel();
/// });
///
/// orchestrator.run().await?;
/// # Ok(())
/// # }
/// ```

use crate::config::{WorkerConfig, MAX_CONCURRENCY};
use crate::handlers::{HandlerContext, HandlerError, HandlerRegistry};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use userdir_shared::queue::{TaskMessage, TaskOutcome, TaskQueue};

/// Worker orchestrator
pub struct WorkerOrchestrator {
    queue: Arc<dyn TaskQueue>,
    registry: Arc<HandlerRegistry>,
    config: WorkerConfig,

    /// One permit per execution slot
    slots: Arc<Semaphore>,

    shutdown_token: CancellationToken,
}

impl WorkerOrchestrator {
    /// Creates an orchestrator over `queue`
    ///
    /// `concurrency` is clamped to `1..=MAX_CONCURRENCY`.
    pub fn new(queue: Arc<dyn TaskQueue>, registry: HandlerRegistry, config: WorkerConfig) -> Self {
        let concurrency = config.concurrency.clamp(1, MAX_CONCURRENCY);

        WorkerOrchestrator {
            queue,
            registry: Arc::new(registry),
            config: WorkerConfig {
                concurrency,
                ..config
            },
            slots: Arc::new(Semaphore::new(concurrency)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the worker loop until the shutdown token is cancelled
    ///
    /// # Errors
    ///
    /// Only fails if the slot semaphore is closed, which does not happen
    /// while the orchestrator is alive. Queue errors are logged and retried
    /// after one poll interval.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            concurrency = self.config.concurrency,
            queue = %self.config.queue_name,
            handlers = ?self.registry.names(),
            "Worker orchestrator starting"
        );

        loop {
            let permit = tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                permit = self.slots.clone().acquire_owned() => permit?,
            };

            // Dequeue is not raced against shutdown: dropping a blocking pop
            // midway can lose a message the broker already handed out.
            if self.shutdown_token.is_cancelled() {
                break;
            }

            match self.queue.dequeue(self.config.poll_interval()).await {
                Ok(Some(message)) => self.dispatch(message, permit),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Failed to dequeue task");
                    drop(permit);
                    tokio::select! {
                        _ = self.shutdown_token.cancelled() => break,
                        _ = tokio::time::sleep(self.config.poll_interval()) => {}
                    }
                }
            }
        }

        self.drain().await;
        tracing::info!("Worker orchestrator shut down");
        Ok(())
    }

    /// Dequeues and executes a single task inline
    ///
    /// Returns `None` when nothing arrived within the poll interval.
    pub async fn process_next(&self) -> anyhow::Result<Option<TaskOutcome>> {
        let Some(message) = self.queue.dequeue(self.config.poll_interval()).await? else {
            return Ok(None);
        };

        let outcome = execute_message(&self.registry, message).await;
        self.record(&outcome).await;
        Ok(Some(outcome))
    }

    fn dispatch(&self, message: TaskMessage, permit: OwnedSemaphorePermit) {
        let registry = self.registry.clone();
        let queue = self.queue.clone();
        let record_results = self.config.record_results;

        tokio::spawn(async move {
            let outcome = execute_message(&registry, message).await;
            if record_results {
                record_outcome(queue.as_ref(), &outcome).await;
            }
            drop(permit);
        });
    }

    async fn record(&self, outcome: &TaskOutcome) {
        if self.config.record_results {
            record_outcome(self.queue.as_ref(), outcome).await;
        }
    }

    /// Waits for every slot to come back, bounded by the shutdown grace
    async fn drain(&self) {
        let in_flight = self.config.concurrency - self.slots.available_permits();
        if in_flight == 0 {
            return;
        }

        tracing::info!(in_flight, "Shutdown requested, waiting for active tasks to complete");

        let all_slots = u32::try_from(self.config.concurrency).unwrap_or(u32::MAX);
        match tokio::time::timeout(self.config.shutdown_grace(), self.slots.acquire_many(all_slots))
            .await
        {
            Ok(_) => tracing::info!("All active tasks completed"),
            Err(_) => tracing::warn!(
                count = self.config.concurrency - self.slots.available_permits(),
                "Force shutdown with tasks still running"
            ),
        }
    }
}

/// Executes one message against the registry
///
/// The handler runs in its own Tokio task so that a panic is caught as a
/// `JoinError` and turned into a failed outcome.
pub async fn execute_message(registry: &HandlerRegistry, message: TaskMessage) -> TaskOutcome {
    let Some(handler) = registry.get(&message.name) else {
        tracing::error!(task_id = %message.id, task_name = %message.name, "No handler registered");
        return TaskOutcome::failed(&message, format!("Unknown task: {}", message.name));
    };

    tracing::info!(task_id = %message.id, task_name = %message.name, "Executing task");

    let started = Instant::now();
    let context = HandlerContext::new(message.id.clone(), message.args.clone());
    let joined = tokio::spawn(async move { handler.handle(context).await }).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let result = joined.unwrap_or_else(|e| {
        let reason = if e.is_panic() { "handler panicked" } else { "handler aborted" };
        Err(HandlerError::ExecutionFailed(reason.to_string()))
    });

    match result {
        Ok(result) => {
            tracing::info!(task_id = %message.id, elapsed_ms, "Task succeeded");
            TaskOutcome::succeeded(&message, result)
        }
        Err(e) => {
            tracing::error!(task_id = %message.id, elapsed_ms, error = %e, "Task failed");
            TaskOutcome::failed(&message, e.to_string())
        }
    }
}

async fn record_outcome(queue: &dyn TaskQueue, outcome: &TaskOutcome) {
    if let Err(e) = queue.record_outcome(outcome).await {
        tracing::error!(task_id = %outcome.task_id, error = %e, "Failed to record task outcome");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerResult, TaskHandler};
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Mutex;
    use std::time::Duration;
    use userdir_shared::queue::{MemoryTaskQueue, TaskStatus};
    use userdir_shared::tasks::{GenerateBio, GENERATE_BIO};

    /// Records the task ids it sees, in order
    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TaskHandler for RecordingHandler {
        fn name(&self) -> &str {
            "record"
        }

        async fn handle(&self, context: HandlerContext) -> HandlerResult<JsonValue> {
            self.seen.lock().unwrap().push(context.task_id);
            Ok(JsonValue::Null)
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl TaskHandler for FailingHandler {
        fn name(&self) -> &str {
            "fail"
        }

        async fn handle(&self, _context: HandlerContext) -> HandlerResult<JsonValue> {
            Err(HandlerError::ExecutionFailed("boom".to_string()))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl TaskHandler for PanickingHandler {
        fn name(&self) -> &str {
            "panic"
        }

        async fn handle(&self, _context: HandlerContext) -> HandlerResult<JsonValue> {
            panic!("handler exploded");
        }
    }

    fn test_config(concurrency: usize) -> WorkerConfig {
        WorkerConfig {
            concurrency,
            poll_secs: 1,
            shutdown_grace_secs: 5,
            ..WorkerConfig::default()
        }
    }

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::with_defaults();
        registry.register(Arc::new(FailingHandler));
        registry.register(Arc::new(PanickingHandler));
        registry
    }

    async fn wait_for_outcome(queue: &MemoryTaskQueue, task_id: &str) -> TaskOutcome {
        for _ in 0..200 {
            if let Some(outcome) = queue.outcome(task_id).await {
                return outcome;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no outcome recorded for {}", task_id);
    }

    #[tokio::test]
    async fn test_execute_generate_bio() {
        let message = TaskMessage::new(GENERATE_BIO, GenerateBio::with_default_keywords(1).into_args());
        let outcome = execute_message(&registry(), message).await;

        assert_eq!(outcome.status, TaskStatus::Succeeded);
        assert_eq!(outcome.result, Some(json!("This is a placeholder bio.")));
    }

    #[tokio::test]
    async fn test_execute_unknown_task_fails() {
        let message = TaskMessage::new("no_such_task", vec![]);
        let outcome = execute_message(&registry(), message).await;

        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("Unknown task: no_such_task"));
    }

    #[tokio::test]
    async fn test_execute_handler_error_fails() {
        let outcome = execute_message(&registry(), TaskMessage::new("fail", vec![])).await;
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert!(outcome.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_execute_catches_panic() {
        let outcome = execute_message(&registry(), TaskMessage::new("panic", vec![])).await;
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Task execution failed: handler panicked")
        );
    }

    #[tokio::test]
    async fn test_execute_invalid_arguments_fails() {
        let message = TaskMessage::new(GENERATE_BIO, vec![json!("not-an-id")]);
        let outcome = execute_message(&registry(), message).await;
        assert_eq!(outcome.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_process_next_records_outcome() {
        let queue = MemoryTaskQueue::new();
        let orchestrator =
            WorkerOrchestrator::new(Arc::new(queue.clone()), registry(), test_config(1));

        let task_id = queue
            .enqueue(GENERATE_BIO, GenerateBio::with_default_keywords(3).into_args())
            .await
            .unwrap();

        let outcome = orchestrator.process_next().await.unwrap().unwrap();
        assert_eq!(outcome.task_id, task_id);
        assert_eq!(queue.outcome(&task_id).await, Some(outcome));
    }

    #[tokio::test]
    async fn test_process_next_skips_recording_when_disabled() {
        let queue = MemoryTaskQueue::new();
        let config = WorkerConfig {
            record_results: false,
            ..test_config(1)
        };
        let orchestrator = WorkerOrchestrator::new(Arc::new(queue.clone()), registry(), config);

        let task_id = queue.enqueue("fail", vec![]).await.unwrap();
        orchestrator.process_next().await.unwrap().unwrap();
        assert!(queue.outcome(&task_id).await.is_none());
    }

    #[tokio::test]
    async fn test_run_processes_fifo_and_survives_failures() {
        let queue = MemoryTaskQueue::new();
        let recorder = Arc::new(RecordingHandler::default());
        let mut registry = registry();
        registry.register(recorder.clone());

        let first = queue.enqueue("record", vec![]).await.unwrap();
        let panicked = queue.enqueue("panic", vec![]).await.unwrap();
        let unknown = queue.enqueue("missing", vec![]).await.unwrap();
        let second = queue.enqueue("record", vec![]).await.unwrap();
        let third = queue.enqueue("record", vec![]).await.unwrap();

        let orchestrator = Arc::new(WorkerOrchestrator::new(
            Arc::new(queue.clone()),
            registry,
            test_config(1),
        ));
        let token = orchestrator.shutdown_token();
        let runner = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run().await })
        };

        assert_eq!(wait_for_outcome(&queue, &third).await.status, TaskStatus::Succeeded);
        assert_eq!(wait_for_outcome(&queue, &panicked).await.status, TaskStatus::Failed);
        assert_eq!(wait_for_outcome(&queue, &unknown).await.status, TaskStatus::Failed);

        token.cancel();
        runner.await.unwrap().unwrap();

        assert_eq!(*recorder.seen.lock().unwrap(), vec![first, second, third]);
        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_when_idle() {
        let orchestrator = Arc::new(WorkerOrchestrator::new(
            Arc::new(MemoryTaskQueue::new()),
            registry(),
            test_config(2),
        ));
        let token = orchestrator.shutdown_token();
        let runner = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run().await })
        };

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("worker did not stop")
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let orchestrator = WorkerOrchestrator::new(
            Arc::new(MemoryTaskQueue::new()),
            HandlerRegistry::new(),
            test_config(0),
        );
        assert_eq!(orchestrator.slots.available_permits(), 1);
    }

    #[test]
    fn test_oversized_concurrency_is_clamped() {
        let orchestrator = WorkerOrchestrator::new(
            Arc::new(MemoryTaskQueue::new()),
            HandlerRegistry::new(),
            test_config(usize::MAX),
        );
        assert_eq!(orchestrator.slots.available_permits(), MAX_CONCURRENCY);
    }
}
