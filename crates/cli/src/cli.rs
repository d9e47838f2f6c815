use clap::Parser;

/// Interactive tool-calling chat over MCP.
///
/// Each line is one turn: the model may call tools on the MCP server
/// before answering.
#[derive(Parser, Debug, Default)]
#[command(name = "toolwire-chat", about = "Interactive tool-calling chat over MCP")]
pub struct CliArgs {
    /// Path to config file (default: ~/.config/toolwire/config.toml)
    #[arg(long, env = "TOOLWIRE_CONFIG")]
    pub config: Option<String>,

    /// LLM provider: openai, dashscope, deepseek, qwen or prompted
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// API key for the completion endpoint
    #[arg(long)]
    pub api_key: Option<String>,

    /// MCP endpoint URL
    #[arg(long)]
    pub mcp_url: Option<String>,

    /// System prompt seeded at session start
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Maximum model calls that may offer tools per turn
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Serve tools in-process instead of connecting to an MCP server
    #[arg(long)]
    pub local: bool,

    /// MCP request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}
