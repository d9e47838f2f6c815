//! First-generation single-call endpoint: `{tool_name, parameters}` in,
//! `{success, data, error}` out. Every outcome is HTTP 200.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use toolwire_tool_runtime::{Arguments, InvokeError, ToolCallResult};

use crate::server::McpServer;

pub const LEGACY_CALL_PATH: &str = "/mcp/call";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyCallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Arguments,
}

pub async fn handle_call(State(server): State<Arc<McpServer>>, body: Bytes) -> Json<ToolCallResult> {
    let request: LegacyCallRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return Json(ToolCallResult::failed(format!("Invalid request body: {}", e))),
    };
    debug!(tool = %request.tool_name, "Legacy tool call");

    let result = match server
        .registry()
        .invoke(&request.tool_name, &request.parameters)
        .await
    {
        Ok(result) => result,
        Err(InvokeError::ToolNotFound(name)) => {
            let available: Vec<String> = server.registry().list().into_iter().map(|d| d.name).collect();
            ToolCallResult::failed(format!(
                "Tool not found: {}, available tools: {}",
                name,
                available.join(", ")
            ))
        }
        Err(e) => ToolCallResult::failed(e.to_string()),
    };
    Json(result)
}
