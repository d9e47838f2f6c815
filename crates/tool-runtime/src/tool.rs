use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Argument mapping passed to a tool: parameter name to JSON value.
pub type Arguments = Map<String, Value>;

/// Describes a tool's interface for LLM consumption.
/// Maps to OpenAI's function format and the MCP `inputSchema` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "get_weather", "calculate_sum")
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// Structural schema describing the expected arguments
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: InputSchema) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}

/// Primitive JSON types a property may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl PrimitiveType {
    /// Whether `value` has this type. No coercion: `"42"` is not an integer.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            PrimitiveType::String => value.is_string(),
            PrimitiveType::Integer => value.is_i64() || value.is_u64(),
            PrimitiveType::Number => value.is_number(),
            PrimitiveType::Boolean => value.is_boolean(),
            PrimitiveType::Array => value.is_array(),
            PrimitiveType::Object => value.is_object(),
            PrimitiveType::Null => value.is_null(),
        }
    }

    /// Name of the runtime type of `value`, in the same vocabulary.
    pub fn name_of(value: &Value) -> &'static str {
        match value {
            Value::String(_) => "string",
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Null => "null",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Array => "array",
            PrimitiveType::Object => "object",
            PrimitiveType::Null => "null",
        };
        f.write_str(name)
    }
}

/// A single declared property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: PrimitiveType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Object schema for tool arguments. Property order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: PrimitiveType,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    /// An empty object schema.
    pub fn object() -> Self {
        Self {
            schema_type: PrimitiveType::Object,
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// Declare an optional property.
    pub fn property(
        mut self,
        name: impl Into<String>,
        property_type: PrimitiveType,
        description: impl Into<String>,
    ) -> Self {
        self.properties.insert(
            name.into(),
            PropertySchema {
                property_type,
                description: Some(description.into()),
            },
        );
        self
    }

    /// Mark a property name as required.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }
}

/// Represents an LLM requesting execution of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this invocation (used to match results)
    pub id: String,
    /// Tool name to execute
    pub name: String,
    /// JSON arguments
    #[serde(default)]
    pub arguments: Arguments,
}

/// Outcome of one tool invocation. `error` is present iff `success` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: data.into(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(message.into()),
        }
    }

    /// Render the payload as text: strings verbatim, everything else as JSON.
    pub fn data_text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// The executable half of a tool. Receives arguments already validated
/// against the tool's schema.
///
/// Executors must not keep cross-call mutable state unless they synchronize
/// it themselves; the registry never locks around them.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, arguments: &Arguments) -> Result<Value, ToolError>;
}

#[async_trait]
impl<F> ToolExecutor for F
where
    F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync,
{
    async fn execute(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        self(arguments)
    }
}

/// A self-describing executor: the built-in tools implement this.
pub trait Tool: ToolExecutor {
    /// Returns the tool's definition (name, description, schema).
    fn definition(&self) -> ToolDefinition;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fetch a string argument the schema already guaranteed.
pub fn str_arg<'a>(arguments: &'a Arguments, name: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidInput(format!("missing '{}' field", name)))
}

/// Fetch an integer argument the schema already guaranteed.
pub fn i64_arg(arguments: &Arguments, name: &str) -> Result<i64, ToolError> {
    arguments
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolError::InvalidInput(format!("'{}' must be a 64-bit integer", name)))
}
