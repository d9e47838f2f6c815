use crate::conversation::ConversationMessage;
use crate::tool::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::time::Duration;

/// What the model produced for one completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// A natural-language answer
    Text(String),
    /// One or more tool invocations the model wants run before answering
    ToolCalls(Vec<ToolCall>),
}

/// Trait for LLM providers that support tool use.
///
/// This trait lives in tool-runtime (not in crates/llm) because it's
/// defined by the consumer (the orchestrator), not the provider.
/// Implementations live in crates/llm.
#[async_trait]
pub trait ToolAwareLlmProvider: Send + Sync {
    /// Complete the conversation. An empty `tools` slice means the model
    /// must answer in text.
    async fn complete_with_tools(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, LlmError>;

    /// Provider name for logging/debugging (e.g., "openai", "prompted")
    fn provider_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Authentication failed")]
    AuthError,
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Mock LLM provider for testing the orchestrator without real API calls.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<ModelReply, LlmError>,
        delay: Option<Duration>,
    }

    /// One recorded `complete_with_tools` call.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub messages: Vec<ConversationMessage>,
        pub tools: Vec<ToolDefinition>,
    }

    /// A mock provider that returns pre-configured replies in FIFO order.
    #[derive(Default)]
    pub struct MockLlmProvider {
        script: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockLlmProvider {
        pub fn new() -> Self {
            Self::default()
        }

        fn push(&self, reply: Result<ModelReply, LlmError>, delay: Option<Duration>) {
            self.script
                .lock()
                .unwrap()
                .push_back(Scripted { reply, delay });
        }

        /// Queue a plain text answer.
        pub fn queue_text(&self, text: &str) {
            self.push(Ok(ModelReply::Text(text.to_string())), None);
        }

        /// Queue a single tool call.
        pub fn queue_tool_call(&self, id: &str, name: &str, arguments: Value) {
            self.queue_tool_calls(vec![(id, name, arguments)]);
        }

        /// Queue several tool calls in one reply.
        pub fn queue_tool_calls(&self, calls: Vec<(&str, &str, Value)>) {
            let calls = calls
                .into_iter()
                .map(|(id, name, arguments)| ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: arguments.as_object().cloned().unwrap_or_default(),
                })
                .collect();
            self.push(Ok(ModelReply::ToolCalls(calls)), None);
        }

        /// Queue a failure.
        pub fn queue_error(&self, error: LlmError) {
            self.push(Err(error), None);
        }

        /// Queue a text answer that only arrives after `delay`.
        pub fn queue_delayed_text(&self, text: &str, delay: Duration) {
            self.push(Ok(ModelReply::Text(text.to_string())), Some(delay));
        }

        /// Every request seen so far.
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolAwareLlmProvider for MockLlmProvider {
        async fn complete_with_tools(
            &self,
            messages: &[ConversationMessage],
            tools: &[ToolDefinition],
        ) -> Result<ModelReply, LlmError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                messages: messages.to_vec(),
                tools: tools.to_vec(),
            });
            let next = self.script.lock().unwrap().pop_front();
            let Some(scripted) = next else {
                return Err(LlmError::InvalidResponse("mock script exhausted".into()));
            };
            if let Some(delay) = scripted.delay {
                tokio::time::sleep(delay).await;
            }
            scripted.reply
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }
}
