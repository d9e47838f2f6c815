//! Translation between provider-agnostic conversation types and the OpenAI chat format.

use serde_json::{json, Map, Value};

use toolwire_tool_runtime::{ConversationMessage, LlmError, ModelReply, ToolCall, ToolDefinition};

/// Translate a [`ToolDefinition`] into the OpenAI function tool format.
pub(super) fn tool_definition_to_openai(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        },
    })
}

/// Translate history into OpenAI messages.
///
/// History keeps only the `tool` results of dispatched calls, so each run of
/// consecutive tool messages is preceded by a rebuilt assistant message
/// carrying the matching `tool_calls`.
pub(super) fn messages_to_openai(messages: &[ConversationMessage]) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len());
    let mut i = 0;
    while i < messages.len() {
        match &messages[i] {
            ConversationMessage::Tool { .. } => {
                let run_end = messages[i..]
                    .iter()
                    .position(|m| !matches!(m, ConversationMessage::Tool { .. }))
                    .map_or(messages.len(), |offset| i + offset);
                let run = &messages[i..run_end];
                out.push(assistant_tool_calls(run));
                out.extend(run.iter().map(message_to_openai));
                i = run_end;
            }
            other => {
                out.push(message_to_openai(other));
                i += 1;
            }
        }
    }
    out
}

fn message_to_openai(msg: &ConversationMessage) -> Value {
    match msg {
        ConversationMessage::System { content } => json!({"role": "system", "content": content}),
        ConversationMessage::User { content } => json!({"role": "user", "content": content}),
        ConversationMessage::Assistant { content } => json!({"role": "assistant", "content": content}),
        ConversationMessage::Tool {
            tool_call_id,
            content,
            ..
        } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": content,
        }),
    }
}

fn assistant_tool_calls(run: &[ConversationMessage]) -> Value {
    let calls: Vec<Value> = run
        .iter()
        .filter_map(|m| match m {
            ConversationMessage::Tool {
                tool_call_id,
                tool_name,
                arguments,
                ..
            } => Some(json!({
                "id": tool_call_id,
                "type": "function",
                "function": {
                    "name": tool_name,
                    "arguments": Value::Object(arguments.clone()).to_string(),
                },
            })),
            _ => None,
        })
        .collect();
    json!({
        "role": "assistant",
        "content": Value::Null,
        "tool_calls": calls,
    })
}

/// Interpret `choices[0].message`.
pub(super) fn parse_reply(message: &Value) -> Result<ModelReply, LlmError> {
    if let Some(calls) = message["tool_calls"].as_array().filter(|c| !c.is_empty()) {
        let calls = calls
            .iter()
            .map(parse_tool_call)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(ModelReply::ToolCalls(calls));
    }

    match &message["content"] {
        Value::String(text) => Ok(ModelReply::Text(text.clone())),
        Value::Null => Err(LlmError::InvalidResponse(
            "message has neither content nor tool_calls".into(),
        )),
        other => Err(LlmError::InvalidResponse(format!(
            "unexpected content type: {}",
            other
        ))),
    }
}

fn parse_tool_call(call: &Value) -> Result<ToolCall, LlmError> {
    let name = call["function"]["name"]
        .as_str()
        .ok_or_else(|| LlmError::InvalidResponse("tool call without function name".into()))?;
    let id = call["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));

    Ok(ToolCall {
        id,
        name: name.to_string(),
        arguments: parse_arguments(name, &call["function"]["arguments"])?,
    })
}

/// Arguments arrive as a JSON-encoded string; some servers send an object.
fn parse_arguments(name: &str, raw: &Value) -> Result<Map<String, Value>, LlmError> {
    let decoded = match raw {
        Value::Null => return Ok(Map::new()),
        Value::String(s) if s.trim().is_empty() => return Ok(Map::new()),
        Value::String(s) => serde_json::from_str::<Value>(s).map_err(|e| {
            LlmError::InvalidResponse(format!("arguments for '{}' are not JSON: {}", name, e))
        })?,
        other => other.clone(),
    };
    match decoded {
        Value::Object(map) => Ok(map),
        other => Err(LlmError::InvalidResponse(format!(
            "arguments for '{}' must be an object, got {}",
            name, other
        ))),
    }
}
