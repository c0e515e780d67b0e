/// Task handlers and the registry that routes task names to them
///
/// Each handler implements [`TaskHandler`] and is registered under the task
/// name it serves. The orchestrator looks the name up when a message is
/// dequeued; a name with no handler fails the task without stopping the
/// worker.
///
/// # Example
///
/// ```
/// use userdir_worker::handlers::{HandlerContext, HandlerRegistry};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = HandlerRegistry::with_defaults();
/// let handler = registry.get("generate_bio").expect("registered");
///
/// let context = HandlerContext::new(
///     "task-1",
///     vec![serde_json::json!(1), serde_json::json!(["rust"])],
/// );
/// let bio = handler.handle(context).await?;
/// assert_eq!(bio, "This is a placeholder bio.");
/// # Ok(())
/// # }
/// ```

pub mod generate_bio;

pub use generate_bio::GenerateBioHandler;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use userdir_shared::tasks::TaskArgsError;

/// Handler error types
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The positional arguments do not match what the handler expects
    #[error("Invalid task arguments: {0}")]
    InvalidArguments(String),

    /// The handler ran and failed
    #[error("Task execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<TaskArgsError> for HandlerError {
    fn from(err: TaskArgsError) -> Self {
        HandlerError::InvalidArguments(err.to_string())
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;

/// What a handler receives for one task
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub task_id: String,
    pub args: Vec<JsonValue>,
}

impl HandlerContext {
    pub fn new(task_id: impl Into<String>, args: Vec<JsonValue>) -> Self {
        HandlerContext {
            task_id: task_id.into(),
            args,
        }
    }
}

/// A unit of background work, addressed by task name
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Task name this handler serves
    fn name(&self) -> &str;

    /// Runs the task and returns its result value
    ///
    /// Handlers may be invoked more than once for the same task id and
    /// must tolerate it.
    async fn handle(&self, context: HandlerContext) -> HandlerResult<JsonValue>;
}

/// Task name to handler mapping
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GenerateBioHandler::new()));
        registry
    }

    /// Registers a handler under its own name, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        let name = handler.name().to_string();
        tracing::info!(task_name = %name, "Registering task handler");
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, task_name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_name).cloned()
    }

    /// Registered task names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use userdir_shared::tasks::GENERATE_BIO;

    struct EchoHandler;

    #[async_trait]
    impl TaskHandler for EchoHandler {
        fn name(&self) -> &str {
            "echo"
        }

        async fn handle(&self, context: HandlerContext) -> HandlerResult<JsonValue> {
            Ok(JsonValue::Array(context.args))
        }
    }

    #[test]
    fn test_defaults_include_generate_bio() {
        let registry = HandlerRegistry::with_defaults();
        assert!(registry.get(GENERATE_BIO).is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.names(), vec![GENERATE_BIO]);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(EchoHandler));
        registry.register(Arc::new(EchoHandler));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_dispatches_to_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(EchoHandler));

        let handler = registry.get("echo").unwrap();
        let result = handler
            .handle(HandlerContext::new("t", vec![serde_json::json!(1)]))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!([1]));
    }

    #[test]
    fn test_args_error_maps_to_invalid_arguments() {
        let err: HandlerError = TaskArgsError::Arity {
            expected: 2,
            found: 0,
        }
        .into();
        assert!(matches!(err, HandlerError::InvalidArguments(_)));
    }
}
