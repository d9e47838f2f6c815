//! JSON-RPC envelope and MCP protocol types.
//!
//! Requests and responses are JSON-RPC 2.0 shaped, with the version carried
//! under `protocolVersion` (the classic `jsonrpc` key is accepted on input).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use toolwire_tool_runtime::{Arguments, InputSchema, ToolCallResult, ToolDefinition};

use crate::error::McpError;

/// The envelope version this crate speaks.
pub const PROTOCOL_VERSION: &str = "2.0";

// ── JSON-RPC Base Types ─────────────────────────────────────────────

/// A request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "protocolVersion", alias = "jsonrpc")]
    pub protocol_version: String,
    pub id: RpcId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// A response envelope. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "protocolVersion", alias = "jsonrpc")]
    pub protocol_version: String,
    /// Echoes the request id; null when the request was too malformed to carry one.
    pub id: Option<RpcId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC request ID. Can be a number or a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcId::Number(n) => write!(f, "{}", n),
            RpcId::String(s) => f.write_str(s),
        }
    }
}

// ── Error codes ─────────────────────────────────────────────────────

/// Caller-visible error codes.
pub mod error_codes {
    /// Envelope missing required fields or not decodable.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Unknown method, or unknown tool name for `call_tool`.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Arguments fail schema validation.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Uncaught server-side fault during dispatch.
    pub const SERVER_ERROR: i64 = -32000;
}

// ── Methods ─────────────────────────────────────────────────────────

/// The methods a server dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ListTools,
    CallTool,
}

impl Method {
    pub const LIST_TOOLS: &'static str = "list_tools";
    pub const CALL_TOOL: &'static str = "call_tool";

    /// Resolve a method name, accepting the `tools/*` aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::LIST_TOOLS | "tools/list" => Some(Method::ListTools),
            Self::CALL_TOOL | "tools/call" => Some(Method::CallTool),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::ListTools => Self::LIST_TOOLS,
            Method::CallTool => Self::CALL_TOOL,
        }
    }
}

// ── MCP list_tools ──────────────────────────────────────────────────

/// Result of `list_tools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolInfo>,
}

/// Describes a single tool in MCP format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl From<ToolDefinition> for ToolInfo {
    fn from(def: ToolDefinition) -> Self {
        Self {
            name: def.name,
            description: def.description,
            input_schema: def.input_schema,
        }
    }
}

impl From<ToolInfo> for ToolDefinition {
    fn from(info: ToolInfo) -> Self {
        Self {
            name: info.name,
            description: info.description,
            input_schema: info.input_schema,
        }
    }
}

// ── MCP call_tool ───────────────────────────────────────────────────

/// Parameters for `call_tool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

/// Result of `call_tool`. Tool-level failures set `isError` rather than
/// producing an RPC error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

/// Content block within a tool call result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

impl CallToolResult {
    /// Concatenated text of every content block.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_tool_result(self) -> ToolCallResult {
        let text = self.text();
        if self.is_error {
            ToolCallResult::failed(text)
        } else {
            ToolCallResult::ok(text)
        }
    }
}

impl From<ToolCallResult> for CallToolResult {
    fn from(result: ToolCallResult) -> Self {
        let (text, is_error) = if result.success {
            (result.data_text(), false)
        } else {
            (result.error.unwrap_or_default(), true)
        };
        Self {
            content: vec![ToolContent::Text { text }],
            is_error,
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

impl JsonRpcRequest {
    pub fn new(id: RpcId, method: impl Into<String>, params: Value) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Decode an incoming request, naming the first missing required field.
    pub fn from_value(raw: Value) -> Result<Self, McpError> {
        let Value::Object(fields) = &raw else {
            return Err(McpError::Protocol("request must be a JSON object".into()));
        };
        if !fields.contains_key("protocolVersion") && !fields.contains_key("jsonrpc") {
            return Err(missing("protocolVersion"));
        }
        for key in ["id", "method"] {
            if fields.get(key).map_or(true, Value::is_null) {
                return Err(missing(key));
            }
        }
        serde_json::from_value(raw).map_err(|e| McpError::Protocol(e.to_string()))
    }

    /// Best-effort id extraction for error replies to undecodable requests.
    pub fn peek_id(raw: &Value) -> Option<RpcId> {
        raw.get("id")
            .cloned()
            .and_then(|id| serde_json::from_value(id).ok())
    }

    /// `params` as an object; absent params read as empty.
    pub fn params_object(&self) -> Result<Map<String, Value>, McpError> {
        match &self.params {
            Value::Null => Ok(Map::new()),
            Value::Object(map) => Ok(map.clone()),
            _ => Err(McpError::InvalidParams("params must be an object".into())),
        }
    }
}

fn missing(field: &str) -> McpError {
    McpError::Protocol(format!("missing required field '{}'", field))
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: RpcId, result: Value) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn failure(id: Option<RpcId>, error: JsonRpcError) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Validate the result/error exclusivity and unwrap the payload.
    pub fn into_outcome(self) -> Result<Value, McpError> {
        match (self.result, self.error) {
            (Some(result), None) => Ok(result),
            (None, Some(error)) => Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            }),
            _ => Err(McpError::Protocol(
                "response must carry exactly one of result or error".into(),
            )),
        }
    }
}
