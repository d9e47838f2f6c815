//! MCP tool protocol over HTTP for toolwire.
//!
//! Exposes a `ToolRegistry` as `list_tools` / `call_tool` JSON-RPC envelopes
//! and provides the matching client.
//!
//! # Architecture
//!
//! - **types**: envelope and MCP payload types
//! - **server**: dispatch of envelopes against a `ToolRegistry`
//! - **http**: axum router, status mapping, graceful serve
//! - **legacy**: first-generation `{tool_name, parameters}` endpoint
//! - **transport**: HTTP and in-process request/response exchange
//! - **client**: id-correlating client, also a `ToolGateway`
//! - **error**: unified error types and the error-code table
//!
//! # Usage
//!
//! ## Server
//! ```no_run
//! use std::sync::Arc;
//! use toolwire_core::Config;
//! use toolwire_mcp::{http, McpServer};
//! use toolwire_tool_runtime::default_registry;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = Arc::new(McpServer::new(default_registry()?));
//! http::serve(server, &Config::from_env().server).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Client
//! ```no_run
//! use toolwire_mcp::McpClient;
//!
//! # async fn example() -> Result<(), toolwire_mcp::McpError> {
//! let client = McpClient::http("http://localhost:18001/mcp");
//! let tools = client.list_tools().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod legacy;
pub mod server;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use error::McpError;
pub use server::McpServer;
pub use transport::{HttpTransport, InProcessTransport, McpTransport};
pub use types::*;
