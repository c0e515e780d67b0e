/// Wire types carried by the task queue
///
/// A [`TaskMessage`] is what the API enqueues and the worker dequeues. A
/// [`TaskOutcome`] is what the worker writes back to the result backend.
///
/// # Format
///
/// ```json
/// {
///   "id": "3f0c1c9e-5c7e-4a55-9d4b-2f1a8f0b2f77",
///   "name": "generate_bio",
///   "args": [7, ["professional", "Python", "flask"]],
///   "enqueued_at": "2025-01-04T12:00:00Z"
/// }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// A unit of work waiting in the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Opaque task id returned to the caller at enqueue time
    pub id: String,

    /// Name of the handler that executes this task
    pub name: String,

    /// Positional arguments
    pub args: Vec<JsonValue>,

    /// When the task was enqueued
    pub enqueued_at: DateTime<Utc>,
}

impl TaskMessage {
    /// Builds a message with a fresh UUID v4 id
    pub fn new(name: impl Into<String>, args: Vec<JsonValue>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            args,
            enqueued_at: Utc::now(),
        }
    }
}

/// Terminal state of an executed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result record written after a task finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: String,
    pub task_name: String,
    pub status: TaskStatus,

    /// Handler return value on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,

    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub finished_at: DateTime<Utc>,
}

impl TaskOutcome {
    pub fn succeeded(message: &TaskMessage, result: JsonValue) -> Self {
        Self {
            task_id: message.id.clone(),
            task_name: message.name.clone(),
            status: TaskStatus::Succeeded,
            result: Some(result),
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(message: &TaskMessage, error: impl Into<String>) -> Self {
        Self {
            task_id: message.id.clone(),
            task_name: message.name.clone(),
            status: TaskStatus::Failed,
            result: None,
            error: Some(error.into()),
            finished_at: Utc::now(),
        }
    }

    /// Failed outcome for a popped payload that is not a valid `TaskMessage`
    ///
    /// Returns `None` when the payload carries no string `id` to key the
    /// outcome by.
    pub fn undecodable(payload: &str, error: impl Into<String>) -> Option<Self> {
        let value: JsonValue = serde_json::from_str(payload).ok()?;
        let task_id = value.get("id")?.as_str()?.to_string();
        let task_name = value
            .get("name")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            task_id,
            task_name,
            status: TaskStatus::Failed,
            result: None,
            error: Some(error.into()),
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_undecodable_payload_keeps_its_id() {
        let outcome = TaskOutcome::undecodable(
            r#"{"id": "abc", "name": "generate_bio", "args": "not-a-list"}"#,
            "bad args",
        )
        .unwrap();
        assert_eq!(outcome.task_id, "abc");
        assert_eq!(outcome.task_name, "generate_bio");
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("bad args"));

        assert!(TaskOutcome::undecodable("{oops", "x").is_none());
        assert!(TaskOutcome::undecodable(r#"{"id": 7}"#, "x").is_none());
    }

    #[test]
    fn test_new_message_ids_are_unique() {
        let a = TaskMessage::new("generate_bio", vec![json!(1)]);
        let b = TaskMessage::new("generate_bio", vec![json!(1)]);
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_empty());
    }

    #[test]
    fn test_message_wire_format() {
        let message = TaskMessage::new("generate_bio", vec![json!(7), json!(["rust"])]);
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["name"], "generate_bio");
        assert_eq!(value["args"], json!([7, ["rust"]]));
        assert!(value["enqueued_at"].is_string());

        let back: TaskMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_failed_outcome_omits_result() {
        let message = TaskMessage::new("generate_bio", vec![]);
        let outcome = TaskOutcome::failed(&message, "boom");
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "boom");
        assert!(value.get("result").is_none());
        assert_eq!(value["task_id"], message.id);
    }
}
