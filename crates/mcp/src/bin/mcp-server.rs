//! Standalone MCP server exposing the built-in tools over HTTP.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use toolwire_core::config::{self, Config};
use toolwire_mcp::{http, McpServer};
use toolwire_tool_runtime::default_registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let registry = default_registry().context("failed to build tool registry")?;
    for def in registry.list() {
        info!(tool = %def.name, "Serving tool");
    }

    let server = Arc::new(McpServer::new(registry));
    http::serve(server, &config.server).await
}
