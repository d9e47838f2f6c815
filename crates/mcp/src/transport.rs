//! MCP transport layer.
//!
//! Defines the `McpTransport` trait for exchanging one request envelope for
//! its response, with an HTTP implementation and an in-process one.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::McpError;
use crate::server::McpServer;
use crate::types::{JsonRpcRequest, JsonRpcResponse};

/// Trait for MCP message transport.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send `request` and wait for the envelope answering it.
    async fn round_trip(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError>;
}

/// HTTP POST transport to a single endpoint URL.
///
/// Any response body that decodes as an envelope is returned as-is,
/// whatever the HTTP status. A non-2xx status with some other body is a
/// transport error.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

fn from_reqwest(e: reqwest::Error) -> McpError {
    McpError::Transport {
        message: e.to_string(),
        timeout: e.is_timeout(),
        status: e.status().map(|s| s.as_u16()),
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn round_trip(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        let body = response.bytes().await.map_err(from_reqwest)?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        match serde_json::from_slice::<JsonRpcResponse>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => Err(McpError::Transport {
                message: format!("response is not an envelope: {}", e),
                timeout: false,
                status: Some(status.as_u16()),
            }),
            Err(_) => Err(McpError::Transport {
                message: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    String::from_utf8_lossy(&body).chars().take(200).collect::<String>()
                ),
                timeout: false,
                status: Some(status.as_u16()),
            }),
        }
    }
}

/// Hands envelopes straight to an [`McpServer`] in the same process.
pub struct InProcessTransport {
    server: Arc<McpServer>,
}

impl InProcessTransport {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl McpTransport for InProcessTransport {
    async fn round_trip(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let raw: Value = serde_json::to_value(request)?;
        Ok(self.server.handle_request(raw).await)
    }
}
