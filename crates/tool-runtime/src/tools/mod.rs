//! Built-in tools.
//!
//! The weather and arithmetic tools back the default MCP server catalog;
//! `echo` is a diagnostic tool used by tests and health checks.

pub mod echo;
pub mod sum;
pub mod weather;

pub use echo::EchoTool;
pub use sum::CalculateSumTool;
pub use weather::GetWeatherTool;

use crate::registry::{RegistryError, ToolRegistry};

/// Registry holding `get_weather` then `calculate_sum`.
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register_tool(GetWeatherTool)?;
    registry.register_tool(CalculateSumTool)?;
    Ok(registry)
}
