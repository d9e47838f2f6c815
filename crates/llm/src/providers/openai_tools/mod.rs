//! OpenAI-compatible implementation of [`ToolAwareLlmProvider`] using native
//! function calling (`tools` / `tool_calls`).
//!
//! Works against any endpoint speaking the chat completions format, including
//! DashScope's compatible mode, DeepSeek and OpenAI itself.

mod translate;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use toolwire_core::config::LlmConfig;
use toolwire_tool_runtime::{ConversationMessage, LlmError, ModelReply, ToolAwareLlmProvider, ToolDefinition};

use super::chat::{first_message, ChatCompletions};
use self::translate::{messages_to_openai, parse_reply, tool_definition_to_openai};

pub struct OpenAiToolProvider {
    chat: ChatCompletions,
}

impl OpenAiToolProvider {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            chat: ChatCompletions::from_config(config)?,
        })
    }
}

#[async_trait]
impl ToolAwareLlmProvider for OpenAiToolProvider {
    async fn complete_with_tools(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, LlmError> {
        let mut body = self.chat.body(messages_to_openai(messages));
        if !tools.is_empty() {
            let api_tools: Vec<Value> = tools.iter().map(tool_definition_to_openai).collect();
            body["tools"] = json!(api_tools);
        }

        let response = self.chat.send(&body).await?;
        let reply = parse_reply(first_message(&response)?)?;
        if let ModelReply::ToolCalls(calls) = &reply {
            debug!(model = %self.chat.model(), count = calls.len(), "Model requested tool calls");
        }
        Ok(reply)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
