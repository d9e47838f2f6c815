//! MCP server implementation.
//!
//! Wraps a `ToolRegistry` and answers `list_tools` / `call_tool` envelopes.
//! Every request produces exactly one fully-formed response envelope.

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use toolwire_tool_runtime::ToolRegistry;

use crate::error::McpError;
use crate::types::*;

/// MCP server that bridges a `ToolRegistry` to MCP clients.
///
/// The registry is read-only once the server exists, so one instance can
/// serve any number of concurrent requests.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    server_name: String,
    server_version: String,
}

impl McpServer {
    /// Create a new MCP server wrapping the given tool registry.
    pub fn new(registry: impl Into<Arc<ToolRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            server_name: "toolwire-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.server_name
    }

    pub fn version(&self) -> &str {
        &self.server_version
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw request body and produce its response envelope.
    pub async fn handle_request(&self, raw: Value) -> JsonRpcResponse {
        let peeked_id = JsonRpcRequest::peek_id(&raw);
        let request = match JsonRpcRequest::from_value(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejected malformed request");
                return JsonRpcResponse::failure(peeked_id, e.to_rpc_error());
            }
        };

        debug!(id = %request.id, method = %request.method, "Dispatching request");

        let outcome = AssertUnwindSafe(self.dispatch(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(McpError::ServerFault("panic during dispatch".into())));

        match outcome {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(e) => {
                if e.code() == error_codes::SERVER_ERROR {
                    warn!(id = %request.id, error = %e, "Dispatch fault");
                } else {
                    debug!(id = %request.id, error = %e, "Request rejected");
                }
                JsonRpcResponse::failure(Some(request.id), e.to_rpc_error())
            }
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> Result<Value, McpError> {
        match Method::from_name(&request.method) {
            Some(Method::ListTools) => self.handle_list_tools(),
            Some(Method::CallTool) => self.handle_call_tool(request).await,
            None => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    fn handle_list_tools(&self) -> Result<Value, McpError> {
        let tools: Vec<ToolInfo> = self.registry.list().into_iter().map(ToolInfo::from).collect();
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> Result<Value, McpError> {
        let params = request.params_object()?;
        let params: CallToolParams = serde_json::from_value(Value::Object(params))
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;

        info!(tool = %params.name, id = %request.id, "Calling tool");
        let result = self.registry.invoke(&params.name, &params.arguments).await?;
        if !result.success {
            debug!(tool = %params.name, error = ?result.error, "Tool reported failure");
        }

        Ok(serde_json::to_value(CallToolResult::from(result))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolwire_tool_runtime::{
        default_registry, Arguments, InputSchema, PrimitiveType, ToolDefinition, ToolError,
    };

    fn server() -> McpServer {
        McpServer::new(default_registry().unwrap())
    }

    fn call(id: i64, name: &str, arguments: Value) -> Value {
        json!({
            "protocolVersion": "2.0",
            "id": id,
            "method": "call_tool",
            "params": {"name": name, "arguments": arguments}
        })
    }

    fn error_code(resp: &JsonRpcResponse) -> i64 {
        resp.error.as_ref().map(|e| e.code).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_list_tools_in_registration_order() {
        let resp = server()
            .handle_request(json!({"protocolVersion": "2.0", "id": 1, "method": "list_tools", "params": {}}))
            .await;

        assert_eq!(resp.id, Some(RpcId::Number(1)));
        let result: ListToolsResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        let names: Vec<&str> = result.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_weather", "calculate_sum"]);
    }

    #[tokio::test]
    async fn test_listed_definitions_match_registered() {
        let srv = server();
        let resp = srv
            .handle_request(json!({"jsonrpc": "2.0", "id": "x", "method": "tools/list"}))
            .await;
        let result: ListToolsResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        let defs: Vec<ToolDefinition> = result.tools.into_iter().map(ToolDefinition::from).collect();
        assert_eq!(defs, srv.registry().list());
    }

    #[tokio::test]
    async fn test_call_weather_success() {
        let resp = server()
            .handle_request(call(2, "get_weather", json!({"city": "Beijing"})))
            .await;

        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text(), "Beijing: sunny, 25°C, light breeze");
    }

    #[tokio::test]
    async fn test_call_weather_missing_city() {
        let resp = server().handle_request(call(3, "get_weather", json!({}))).await;

        assert_eq!(resp.id, Some(RpcId::Number(3)));
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32602);
        assert!(err.message.contains("city"));
        assert_eq!(err.data.unwrap()["missingRequired"], json!(["city"]));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let srv = server();
        let resp = srv.handle_request(call(4, "unknown_tool", json!({"x": 1}))).await;
        assert_eq!(error_code(&resp), -32601);

        let resp = srv
            .handle_request(json!({"protocolVersion": "2.0", "id": 5, "method": "initialize"}))
            .await;
        assert_eq!(error_code(&resp), -32601);
        assert_eq!(resp.id, Some(RpcId::Number(5)));
    }

    #[tokio::test]
    async fn test_malformed_envelopes() {
        let srv = server();

        let resp = srv.handle_request(json!({"id": 6, "method": "list_tools"})).await;
        assert_eq!(error_code(&resp), -32600);
        assert_eq!(resp.id, Some(RpcId::Number(6)));

        let resp = srv.handle_request(json!({"protocolVersion": "2.0", "method": "list_tools"})).await;
        assert_eq!(error_code(&resp), -32600);
        assert_eq!(resp.id, None);

        let resp = srv.handle_request(json!("not an object")).await;
        assert_eq!(error_code(&resp), -32600);
    }

    #[tokio::test]
    async fn test_bad_params_shape() {
        let srv = server();
        let resp = srv
            .handle_request(json!({"protocolVersion": "2.0", "id": 7, "method": "call_tool", "params": [1]}))
            .await;
        assert_eq!(error_code(&resp), -32602);

        let resp = srv
            .handle_request(json!({"protocolVersion": "2.0", "id": 8, "method": "call_tool", "params": {"arguments": {}}}))
            .await;
        assert_eq!(error_code(&resp), -32602);

        let resp = srv
            .handle_request(call(9, "calculate_sum", json!("1,2")))
            .await;
        assert_eq!(error_code(&resp), -32602);
    }

    #[tokio::test]
    async fn test_tool_fault_is_a_result_not_an_rpc_error() {
        let resp = server()
            .handle_request(call(10, "calculate_sum", json!({"a": i64::MAX, "b": 1})))
            .await;
        assert!(resp.error.is_none());
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error);
        assert!(result.text().contains("overflows"));
    }

    #[tokio::test]
    async fn test_rejected_calls_never_reach_executor() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::new(
                    "counted",
                    "counts invocations",
                    InputSchema::object()
                        .property("n", PrimitiveType::Integer, "n")
                        .required("n"),
                ),
                |_: &Arguments| -> Result<Value, ToolError> {
                    CALLS.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("ok"))
                },
            )
            .unwrap();
        let srv = McpServer::new(registry);

        srv.handle_request(call(1, "counted", json!({}))).await;
        srv.handle_request(call(2, "counted", json!({"n": "1"}))).await;
        srv.handle_request(call(3, "uncounted", json!({"n": 1}))).await;
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        let resp = srv.handle_request(call(4, "counted", json!({"n": 1}))).await;
        assert!(resp.result.is_some());
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
