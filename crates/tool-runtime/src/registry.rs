use crate::schema::{self, SchemaError};
use crate::tool::{Arguments, Tool, ToolCallResult, ToolDefinition, ToolExecutor};
use futures::FutureExt;
use indexmap::IndexMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

struct Entry {
    definition: ToolDefinition,
    executor: Arc<dyn ToolExecutor>,
}

/// Manages available tools, their schemas, and invocation.
///
/// Populated during setup, then shared read-only (typically behind an `Arc`).
/// Listing order is registration order.
pub struct ToolRegistry {
    tools: IndexMap<String, Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Register a definition with its executor. Fails if the name is taken.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        executor: impl ToolExecutor + 'static,
    ) -> Result<(), RegistryError> {
        self.insert(definition, Arc::new(executor))
    }

    /// Register a self-describing tool.
    pub fn register_tool(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let definition = tool.definition();
        self.insert(definition, Arc::new(tool))
    }

    fn insert(
        &mut self,
        definition: ToolDefinition,
        executor: Arc<dyn ToolExecutor>,
    ) -> Result<(), RegistryError> {
        if self.tools.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateName(definition.name));
        }
        debug!(tool = %definition.name, "Registered tool");
        self.tools.insert(
            definition.name.clone(),
            Entry {
                definition,
                executor,
            },
        );
        Ok(())
    }

    /// Look up a tool definition by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|e| &e.definition)
    }

    /// List all registered tool definitions, in registration order.
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|e| e.definition.clone()).collect()
    }

    /// Validate `arguments` and run the named tool.
    ///
    /// Unknown names and schema violations are caller errors and surface as
    /// [`InvokeError`]. Anything that goes wrong inside the executor,
    /// including a panic, is reported as a failed [`ToolCallResult`].
    pub async fn invoke(&self, name: &str, arguments: &Arguments) -> Result<ToolCallResult, InvokeError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| InvokeError::ToolNotFound(name.to_string()))?;

        schema::validate(&entry.definition.input_schema, arguments)
            .map_err(|error| InvokeError::InvalidArguments {
                tool: name.to_string(),
                error,
            })?;

        let outcome = AssertUnwindSafe(entry.executor.execute(arguments))
            .catch_unwind()
            .await;

        Ok(match outcome {
            Ok(Ok(data)) => ToolCallResult::ok(data),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                ToolCallResult::failed(e.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(tool = %name, panic = %message, "Tool panicked");
                ToolCallResult::failed(format!("Tool '{}' panicked: {}", name, message))
            }
        })
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool with name '{0}' is already registered")]
    DuplicateName(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),
    #[error("Tool '{tool}': {error}")]
    InvalidArguments { tool: String, error: SchemaError },
}
