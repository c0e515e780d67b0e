/// Task names and typed argument lists
///
/// The API and the worker are separate processes that only agree on what
/// goes over the queue. This module is that agreement: the producer builds
/// positional arguments with `into_args` and the handler reads them back
/// with `from_args`.
///
/// # Example
///
/// ```
/// use userdir_shared::tasks::GenerateBio;
///
/// let args = GenerateBio::new(7, vec!["rust".to_string()]).into_args();
/// assert_eq!(args[0], serde_json::json!(7));
///
/// let parsed = GenerateBio::from_args(&args).unwrap();
/// assert_eq!(parsed.user_id, 7);
/// ```

use serde_json::{json, Value as JsonValue};
use thiserror::Error;

/// Name of the bio generation task
pub const GENERATE_BIO: &str = "generate_bio";

/// Keywords used when the caller does not supply any
pub const DEFAULT_BIO_KEYWORDS: [&str; 3] = ["professional", "Python", "flask"];

/// Errors raised while decoding positional task arguments
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskArgsError {
    #[error("expected {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },

    #[error("argument {index} is invalid: {reason}")]
    Invalid { index: usize, reason: String },
}

/// Arguments of the `generate_bio` task: `[user_id, keywords]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateBio {
    pub user_id: i64,
    pub keywords: Vec<String>,
}

impl GenerateBio {
    pub fn new(user_id: i64, keywords: Vec<String>) -> Self {
        Self { user_id, keywords }
    }

    /// Arguments with [`DEFAULT_BIO_KEYWORDS`]
    pub fn with_default_keywords(user_id: i64) -> Self {
        Self::new(
            user_id,
            DEFAULT_BIO_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        )
    }

    /// Encodes as positional arguments; the user id is always first
    pub fn into_args(self) -> Vec<JsonValue> {
        vec![json!(self.user_id), json!(self.keywords)]
    }

    /// Decodes positional arguments
    pub fn from_args(args: &[JsonValue]) -> Result<Self, TaskArgsError> {
        if args.len() != 2 {
            return Err(TaskArgsError::Arity {
                expected: 2,
                found: args.len(),
            });
        }

        let user_id = args[0].as_i64().ok_or_else(|| TaskArgsError::Invalid {
            index: 0,
            reason: "user id must be an integer".to_string(),
        })?;

        let keywords = serde_json::from_value::<Vec<String>>(args[1].clone()).map_err(|e| {
            TaskArgsError::Invalid {
                index: 1,
                reason: e.to_string(),
            }
        })?;

        Ok(Self { user_id, keywords })
    }
}
