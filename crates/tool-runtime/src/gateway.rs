use crate::tool::{Arguments, ToolCallResult, ToolDefinition};
use async_trait::async_trait;

/// Where the orchestrator gets its tool catalog and runs tool calls.
///
/// Implemented by the MCP client, over HTTP or an in-process transport.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, GatewayError>;

    async fn call_tool(&self, name: &str, arguments: &Arguments) -> Result<ToolCallResult, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Connection failure, timeout, or an undecodable response
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        timeout: bool,
        status: Option<u16>,
    },
    /// The server answered with an error envelope
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Transport { timeout: true, .. })
    }
}
