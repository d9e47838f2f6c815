use crate::tool::{i64_arg, Arguments, InputSchema, PrimitiveType, Tool, ToolDefinition, ToolError, ToolExecutor};
use async_trait::async_trait;
use serde_json::Value;

/// Adds two integers.
pub struct CalculateSumTool;

#[async_trait]
impl ToolExecutor for CalculateSumTool {
    async fn execute(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let a = i64_arg(arguments, "a")?;
        let b = i64_arg(arguments, "b")?;
        let sum = a
            .checked_add(b)
            .ok_or_else(|| ToolError::ExecutionFailed(format!("{} + {} overflows", a, b)))?;
        Ok(Value::String(format!("{} + {} = {}", a, b, sum)))
    }
}

impl Tool for CalculateSumTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "calculate_sum",
            "Calculate the sum of two integers",
            InputSchema::object()
                .property("a", PrimitiveType::Integer, "First integer")
                .property("b", PrimitiveType::Integer, "Second integer")
                .required("a")
                .required("b"),
        )
    }
}
