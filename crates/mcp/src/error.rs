//! Error types for the MCP crate.

use serde_json::json;
use toolwire_tool_runtime::{GatewayError, InvokeError, SchemaError};

use crate::types::{error_codes, JsonRpcError};

/// Errors that can occur during MCP operations.
///
/// The first group is raised while a server dispatches a request and maps
/// onto the fixed error-code table via [`McpError::to_rpc_error`]. The second
/// group is only seen by clients.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Malformed envelope.
    #[error("Invalid request: {0}")]
    Protocol(String),

    /// The requested method is not supported.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// The requested tool was not found in the registry.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Arguments failed schema validation.
    #[error("Invalid arguments for '{tool}': {error}")]
    InvalidArguments { tool: String, error: SchemaError },

    /// `params` did not have the method's shape.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Uncaught fault while dispatching.
    #[error("Server error: {0}")]
    ServerFault(String),

    /// Network failure, timeout, or a response that is not an envelope.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        timeout: bool,
        status: Option<u16>,
    },

    /// The server answered with an error envelope.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Failed to encode or decode JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn transport(message: impl Into<String>) -> Self {
        McpError::Transport {
            message: message.into(),
            timeout: false,
            status: None,
        }
    }

    /// Error code for this failure when it ends a server dispatch.
    pub fn code(&self) -> i64 {
        match self {
            McpError::Protocol(_) => error_codes::INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ToolNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidArguments { .. } | McpError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            McpError::Rpc { code, .. } => *code,
            McpError::ServerFault(_) | McpError::Transport { .. } | McpError::Json(_) => {
                error_codes::SERVER_ERROR
            }
        }
    }

    /// Convert to a JSON-RPC error object. Schema failures carry the
    /// offending fields in `data`.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let data = match self {
            McpError::InvalidArguments { error, .. } => Some(json!({
                "missingRequired": error.missing_required,
                "typeMismatches": error.type_mismatches,
            })),
            _ => None,
        };
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data,
        }
    }
}

impl From<InvokeError> for McpError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::ToolNotFound(name) => McpError::ToolNotFound(name),
            InvokeError::InvalidArguments { tool, error } => McpError::InvalidArguments { tool, error },
        }
    }
}

impl From<McpError> for GatewayError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::Transport {
                message,
                timeout,
                status,
            } => GatewayError::Transport {
                message,
                timeout,
                status,
            },
            McpError::Rpc { code, message } => GatewayError::Rpc { code, message },
            McpError::Json(e) => GatewayError::Transport {
                message: format!("undecodable response: {}", e),
                timeout: false,
                status: None,
            },
            other => GatewayError::Rpc {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}
