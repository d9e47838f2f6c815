mod chat;
pub mod openai_tools;
pub mod prompted;

use std::sync::Arc;

use toolwire_core::config::LlmConfig;
use toolwire_tool_runtime::{LlmError, ToolAwareLlmProvider};

/// Create the appropriate tool-aware provider based on config.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn ToolAwareLlmProvider>, LlmError> {
    match config.provider.as_str() {
        "openai" | "dashscope" | "deepseek" | "qwen" => {
            Ok(Arc::new(openai_tools::OpenAiToolProvider::from_config(config)?))
        }
        "prompted" => Ok(Arc::new(prompted::PromptedToolProvider::from_config(config)?)),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}
