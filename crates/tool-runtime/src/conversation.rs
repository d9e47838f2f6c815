use crate::tool::{Arguments, ToolCall, ToolCallResult};
use serde::{Deserialize, Serialize};

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationMessage {
    /// Instructions that frame the whole session
    System { content: String },
    /// User's text input
    User { content: String },
    /// Assistant's final natural-language answer
    Assistant { content: String },
    /// Result of one tool invocation, correlated by call id.
    /// Carries the call's name and arguments so providers can rebuild the
    /// assistant request that preceded it.
    #[serde(rename_all = "camelCase")]
    Tool {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        arguments: Arguments,
        content: String,
    },
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    /// Tool message for `call`. A failed result is rendered as an error
    /// description the model can read.
    pub fn tool_result(call: &ToolCall, result: &ToolCallResult) -> Self {
        let content = if result.success {
            result.data_text()
        } else {
            format!(
                "Error: {}",
                result.error.as_deref().unwrap_or("tool call failed")
            )
        };
        Self::Tool {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            content,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content }
            | Self::Tool { content, .. } => content,
        }
    }
}

/// Append-only conversation history for one session.
///
/// Entries are never edited. The only removal is [`Conversation::rollback_to`],
/// which discards everything appended after a checkpoint taken with
/// [`Conversation::len`].
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history whose first entry is a system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ConversationMessage::system(prompt)],
        }
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    /// Drop every entry appended after `checkpoint`. Returns how many were removed.
    pub fn rollback_to(&mut self, checkpoint: usize) -> usize {
        let removed = self.messages.len().saturating_sub(checkpoint);
        self.messages.truncate(checkpoint);
        removed
    }

    /// Remove everything except a leading system prompt.
    pub fn reset(&mut self) {
        let keep = usize::from(matches!(
            self.messages.first(),
            Some(ConversationMessage::System { .. })
        ));
        self.messages.truncate(keep);
    }
}
