use crate::tool::{str_arg, Arguments, InputSchema, PrimitiveType, Tool, ToolDefinition, ToolError, ToolExecutor};
use async_trait::async_trait;
use serde_json::Value;

/// Echoes its `message` argument back.
pub struct EchoTool;

#[async_trait]
impl ToolExecutor for EchoTool {
    async fn execute(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        Ok(Value::String(str_arg(arguments, "message")?.to_string()))
    }
}

impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "echo",
            "Echoes back the input message",
            InputSchema::object()
                .property("message", PrimitiveType::String, "Message to echo")
                .required("message"),
        )
    }
}
