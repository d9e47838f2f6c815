//! MCP client implementation.
//!
//! Issues `list_tools` / `call_tool` requests over an [`McpTransport`],
//! assigning ids from a per-client monotonic counter and checking that each
//! response answers the request it was sent for.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use toolwire_tool_runtime::{Arguments, GatewayError, ToolCallResult, ToolDefinition, ToolGateway};

use crate::error::McpError;
use crate::server::McpServer;
use crate::transport::{HttpTransport, InProcessTransport, McpTransport};
use crate::types::*;

/// An MCP client bound to one server.
pub struct McpClient {
    transport: Arc<dyn McpTransport>,
    next_id: AtomicI64,
    timeout: Option<Duration>,
}

impl McpClient {
    pub fn new(transport: impl McpTransport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            next_id: AtomicI64::new(1),
            timeout: None,
        }
    }

    /// Client for a server reachable at `url` over HTTP.
    pub fn http(url: impl Into<String>) -> Self {
        Self::new(HttpTransport::new(url))
    }

    /// Client dispatching directly into `server`.
    pub fn in_process(server: Arc<McpServer>) -> Self {
        Self::new(InProcessTransport::new(server))
    }

    /// Bound each round trip; expiry is a transport error with `timeout: true`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send a request and unwrap its result payload.
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(RpcId::Number(id), method, params);

        tracing::debug!(method = %method, id = %id, "Sending request");

        let exchange = self.transport.round_trip(&request);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange).await.map_err(|_| {
                McpError::Transport {
                    message: format!("request {} timed out after {:?}", id, limit),
                    timeout: true,
                    status: None,
                }
            })??,
            None => exchange.await?,
        };

        // A server that could not read the id answers with a null one.
        let answered_unread = response.id.is_none() && response.error.is_some();
        if response.id.as_ref() != Some(&request.id) && !answered_unread {
            return Err(McpError::Protocol(format!(
                "response id {:?} does not match request id {}",
                response.id, request.id
            )));
        }

        response.into_outcome()
    }

    /// Fetch the server's tool catalog.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, McpError> {
        let result = self.request(Method::LIST_TOOLS, json!({})).await?;
        let result: ListToolsResult = serde_json::from_value(result)?;
        tracing::debug!(count = result.tools.len(), "Tool discovery complete");
        Ok(result.tools.into_iter().map(ToolDefinition::from).collect())
    }

    /// Call a tool on the server.
    pub async fn call_tool(&self, name: &str, arguments: &Arguments) -> Result<ToolCallResult, McpError> {
        let params = json!({
            "name": name,
            "arguments": arguments,
        });
        let result = self.request(Method::CALL_TOOL, params).await?;
        let result: CallToolResult = serde_json::from_value(result)?;
        Ok(result.into_tool_result())
    }
}

#[async_trait]
impl ToolGateway for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, GatewayError> {
        McpClient::list_tools(self).await.map_err(GatewayError::from)
    }

    async fn call_tool(&self, name: &str, arguments: &Arguments) -> Result<ToolCallResult, GatewayError> {
        McpClient::call_tool(self, name, arguments)
            .await
            .map_err(GatewayError::from)
    }
}
