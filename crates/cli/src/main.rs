mod cli;
mod config;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use toolwire_core::config::{load_dotenv, Config};
use toolwire_mcp::{McpClient, McpServer};
use toolwire_tool_runtime::{default_registry, Orchestrator, ToolGateway, TurnError};

use crate::cli::CliArgs;
use crate::config::CliConfig;
use crate::terminal::{next_input, spawn_stdin_reader, Input, Terminal};

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env fallbacks
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let terminal = Terminal;

    let file = CliConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let config = file.resolve(&args, Config::from_env());
    config.validate().context("invalid configuration")?;

    let provider = toolwire_llm::create_provider(&config.llm).context("failed to create LLM provider")?;

    let (gateway, tools_from): (Arc<dyn ToolGateway>, String) = if args.local {
        let registry = default_registry().context("failed to build tool registry")?;
        let client = McpClient::in_process(Arc::new(McpServer::new(registry)));
        (Arc::new(client), "in-process".to_string())
    } else {
        let client = McpClient::http(config.mcp_client.url.clone()).with_timeout(config.mcp_client.timeout());
        (Arc::new(client), config.mcp_client.url.clone())
    };
    info!(tools = %tools_from, provider = provider.provider_name(), "Chat session starting");

    let mut orchestrator = Orchestrator::new(provider, gateway)
        .with_max_iterations(config.agent.max_iterations)
        .with_model_timeout(config.llm.timeout())
        .with_tool_timeout(config.mcp_client.timeout())
        .with_parallel_tool_calls(config.agent.parallel_tools);
    if let Some(prompt) = &config.agent.system_prompt {
        orchestrator = orchestrator.with_system_prompt(prompt.clone());
    }

    terminal.print_banner(&config.llm.provider, &config.llm.model, &tools_from)?;

    let mut lines = spawn_stdin_reader();
    loop {
        terminal.print_prompt()?;
        let input = match next_input(&mut lines, interrupted()).await {
            Input::Line(text) => text,
            Input::Empty => continue,
            Input::Exit => {
                terminal.print_info("Goodbye.")?;
                break;
            }
        };

        match orchestrator.run_turn_until(&input, interrupted()).await {
            Ok(outcome) => terminal.display_outcome(&outcome)?,
            Err(TurnError::Cancelled) => terminal.print_info("[cancelled]")?,
            Err(e) => {
                error!(error = %e, "Turn failed");
                terminal.print_error(&e.to_string())?;
            }
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler can't be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
