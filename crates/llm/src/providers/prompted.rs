//! Tool calling for models without native function calling.
//!
//! The catalog is described in the system prompt and the model is asked to
//! answer with a `<FunctionCall>` tag when it wants a tool. Tool results go
//! back as plain user text.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use toolwire_core::config::LlmConfig;
use toolwire_tool_runtime::{ConversationMessage, LlmError, ModelReply, ToolAwareLlmProvider, ToolCall, ToolDefinition};

use super::chat::{first_message, ChatCompletions};

const OPEN_TAG: &str = "<FunctionCall>";
const CLOSE_TAG: &str = "</FunctionCall>";

pub struct PromptedToolProvider {
    chat: ChatCompletions,
}

impl PromptedToolProvider {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            chat: ChatCompletions::from_config(config)?,
        })
    }
}

#[async_trait]
impl ToolAwareLlmProvider for PromptedToolProvider {
    async fn complete_with_tools(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, LlmError> {
        let body = self.chat.body(render_messages(messages, tools));
        let response = self.chat.send(&body).await?;
        let content = first_message(&response)?["content"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))?;

        if tools.is_empty() {
            return Ok(ModelReply::Text(content.to_string()));
        }
        Ok(match extract_call(content) {
            Some(call) => {
                debug!(tool = %call.name, id = %call.id, "Parsed prompted tool call");
                ModelReply::ToolCalls(vec![call])
            }
            None => ModelReply::Text(content.to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "prompted"
    }
}

/// Instructions describing the catalog and the reply format.
fn tool_instructions(tools: &[ToolDefinition]) -> String {
    let mut out = String::from("You can use the following tools:\n");
    for tool in tools {
        let params: Vec<String> = tool
            .input_schema
            .properties
            .iter()
            .map(|(name, prop)| {
                let required = if tool.input_schema.required.contains(name) { "" } else { "?" };
                format!("{}{}: {}", name, required, prop.property_type)
            })
            .collect();
        out.push_str(&format!("- {}({}): {}\n", tool.name, params.join(", "), tool.description));
    }
    out.push_str(&format!(
        "\nTo use a tool, reply with nothing but\n{}{{\"name\": \"<tool name>\", \"parameters\": {{...}}}}{}\n\
         Otherwise answer the user directly.",
        OPEN_TAG, CLOSE_TAG
    ));
    out
}

fn render_messages(messages: &[ConversationMessage], tools: &[ToolDefinition]) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len() + 1);

    let base_system = match messages.first() {
        Some(ConversationMessage::System { content }) => Some(content.as_str()),
        _ => None,
    };
    let system = match (base_system, tools.is_empty()) {
        (Some(base), true) => Some(base.to_string()),
        (Some(base), false) => Some(format!("{}\n\n{}", base, tool_instructions(tools))),
        (None, false) => Some(tool_instructions(tools)),
        (None, true) => None,
    };
    if let Some(system) = system {
        out.push(json!({"role": "system", "content": system}));
    }

    for msg in messages {
        match msg {
            ConversationMessage::System { .. } => {}
            ConversationMessage::User { content } => out.push(json!({"role": "user", "content": content})),
            ConversationMessage::Assistant { content } => {
                out.push(json!({"role": "assistant", "content": content}))
            }
            ConversationMessage::Tool {
                tool_name,
                arguments,
                content,
                ..
            } => {
                let call = json!({"name": tool_name, "parameters": arguments});
                out.push(json!({
                    "role": "assistant",
                    "content": format!("{}{}{}", OPEN_TAG, call, CLOSE_TAG),
                }));
                out.push(json!({
                    "role": "user",
                    "content": format!("Result of {}: {}", tool_name, content),
                }));
            }
        }
    }
    out
}

#[derive(Deserialize)]
struct TaggedCall {
    name: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

/// The call inside the first `<FunctionCall>` tag, if it is well formed.
fn extract_call(content: &str) -> Option<ToolCall> {
    let start = content.find(OPEN_TAG)? + OPEN_TAG.len();
    let len = content[start..].find(CLOSE_TAG)?;
    let tagged: TaggedCall = serde_json::from_str(content[start..start + len].trim()).ok()?;
    if tagged.name.is_empty() {
        return None;
    }
    Some(ToolCall {
        id: format!("call_{}", uuid::Uuid::new_v4().simple()),
        name: tagged.name,
        arguments: tagged.parameters,
    })
}
