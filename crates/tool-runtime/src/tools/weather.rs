use crate::tool::{str_arg, Arguments, InputSchema, PrimitiveType, Tool, ToolDefinition, ToolError, ToolExecutor};
use async_trait::async_trait;
use serde_json::Value;

/// Canned conditions for a handful of cities.
const CONDITIONS: &[(&str, &str)] = &[
    ("beijing", "sunny, 25°C, light breeze"),
    ("shanghai", "cloudy, 28°C, east wind force 3"),
    ("guangzhou", "light rain, 30°C, south wind force 2"),
];

const DEFAULT_CONDITIONS: &str = "sunny, 25°C";

/// Reports current weather for a city from a static table.
pub struct GetWeatherTool;

impl GetWeatherTool {
    fn lookup(city: &str) -> &'static str {
        let key = city.trim().to_lowercase();
        CONDITIONS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, conditions)| *conditions)
            .unwrap_or(DEFAULT_CONDITIONS)
    }
}

#[async_trait]
impl ToolExecutor for GetWeatherTool {
    async fn execute(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let city = str_arg(arguments, "city")?;
        if city.trim().is_empty() {
            return Err(ToolError::InvalidInput("city must not be empty".into()));
        }
        Ok(Value::String(format!("{}: {}", city.trim(), Self::lookup(city))))
    }
}

impl Tool for GetWeatherTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_weather",
            "Get the current weather for a city",
            InputSchema::object()
                .property("city", PrimitiveType::String, "City name, e.g. Beijing")
                .required("city"),
        )
    }
}
