/// `generate_bio` task handler
///
/// Arguments are `[user_id, keywords]` as built by
/// `userdir_shared::tasks::GenerateBio`. Generation itself is a stub: the
/// handler logs the request and returns a fixed placeholder string.

use super::{HandlerContext, HandlerResult, TaskHandler};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use userdir_shared::tasks::{GenerateBio, GENERATE_BIO};

/// Bio returned for every user
pub const PLACEHOLDER_BIO: &str = "This is a placeholder bio.";

#[derive(Debug, Default, Clone)]
pub struct GenerateBioHandler;

impl GenerateBioHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskHandler for GenerateBioHandler {
    fn name(&self) -> &str {
        GENERATE_BIO
    }

    async fn handle(&self, context: HandlerContext) -> HandlerResult<JsonValue> {
        let task = GenerateBio::from_args(&context.args)?;

        tracing::info!(
            task_id = %context.task_id,
            user_id = task.user_id,
            keywords = ?task.keywords,
            "Generating bio"
        );

        Ok(JsonValue::String(PLACEHOLDER_BIO.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerError;
    use serde_json::json;

    #[tokio::test]
    async fn test_returns_placeholder() {
        let args = GenerateBio::with_default_keywords(5).into_args();
        let result = GenerateBioHandler::new()
            .handle(HandlerContext::new("t1", args))
            .await
            .unwrap();

        assert_eq!(result, json!(PLACEHOLDER_BIO));
    }

    #[tokio::test]
    async fn test_rejects_missing_user_id() {
        let err = GenerateBioHandler::new()
            .handle(HandlerContext::new("t2", vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::InvalidArguments(_)));
    }
}
