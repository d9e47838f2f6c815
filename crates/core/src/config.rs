use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Provider names accepted by `LLM_PROVIDER`.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "dashscope", "deepseek", "qwen", "prompted"];

/// Key lookup with profile fallback: `{PROFILE}_{KEY}` first, then `{KEY}`.
///
/// Empty values count as unset.
struct Profiled<'a> {
    profile: &'a str,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Profiled<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        if !self.profile.is_empty() {
            let prefixed = format!("{}_{}", self.profile, key);
            if let Some(v) = (self.lookup)(&prefixed).filter(|s| !s.is_empty()) {
                return Some(v);
            }
        }
        (self.lookup)(key).filter(|s| !s.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.opt(key).as_deref() {
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            _ => default,
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub mcp_client: McpClientConfig,
    pub agent: AgentConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TOOLWIRE_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` is this over `std::env`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let profile = lookup("TOOLWIRE_PROFILE").unwrap_or_default().to_uppercase();
        let p = Profiled {
            profile: &profile,
            lookup: &lookup,
        };
        Self {
            profile: profile.clone(),
            server: ServerConfig::from_profiled(&p),
            llm: LlmConfig::from_profiled(&p),
            mcp_client: McpClientConfig::from_profiled(&p),
            agent: AgentConfig::from_profiled(&p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject values that would make a listener, client or loop unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.server.path.clone()));
        }
        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::UnknownProvider(self.llm.provider.clone()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Zero("LLM_TIMEOUT_SECS"));
        }
        if self.mcp_client.timeout_secs == 0 {
            return Err(ConfigError::Zero("MCP_TIMEOUT_SECS"));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::Zero("AGENT_MAX_ITERATIONS"));
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}{}", self.server.host, self.server.port, self.server.path);
        tracing::info!(
            "  llm:         provider={}, model={}, configured={}",
            self.llm.provider,
            self.llm.model,
            self.llm.is_configured()
        );
        tracing::info!("  mcp client:  url={}", self.mcp_client.url);
        tracing::info!("  agent:       max_iterations={}", self.agent.max_iterations);
    }
}

// ── MCP server ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Endpoint path carrying the RPC envelopes.
    pub path: String,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_profiled(p: &Profiled<'_>) -> Self {
        Self {
            host: p.or("MCP_HOST", "0.0.0.0"),
            port: p.parsed("MCP_PORT", 18001),
            path: p.or("MCP_PATH", "/mcp"),
            cors_origin: p.or("CORS_ORIGIN", "*"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── LLM (OpenAI-compatible) ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "dashscope", "deepseek", "qwen" (native tools) or "prompted"
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    fn from_profiled(p: &Profiled<'_>) -> Self {
        Self {
            provider: p.or("LLM_PROVIDER", "openai").to_lowercase(),
            api_key: p
                .opt("LLM_API_KEY")
                .or_else(|| p.opt("DASHSCOPE_API_KEY"))
                .or_else(|| p.opt("OPENAI_API_KEY")),
            model: p.or("LLM_MODEL", "qwen-plus"),
            base_url: p.or(
                "LLM_BASE_URL",
                "https://dashscope.aliyuncs.com/compatible-mode/v1",
            ),
            temperature: p.parsed("LLM_TEMPERATURE", 0.7),
            max_tokens: p.parsed("LLM_MAX_TOKENS", 1024),
            timeout_secs: p.parsed("LLM_TIMEOUT_SECS", 60),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── MCP client ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpClientConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl McpClientConfig {
    fn from_profiled(p: &Profiled<'_>) -> Self {
        Self {
            url: p.or("MCP_URL", "http://localhost:18001/mcp"),
            timeout_secs: p.parsed("MCP_TIMEOUT_SECS", 10),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Agent loop ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub system_prompt: Option<String>,
    pub parallel_tools: bool,
}

impl AgentConfig {
    fn from_profiled(p: &Profiled<'_>) -> Self {
        Self {
            max_iterations: p.parsed("AGENT_MAX_ITERATIONS", 5),
            system_prompt: p.opt("AGENT_SYSTEM_PROMPT"),
            parallel_tools: p.flag("AGENT_PARALLEL_TOOLS", false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.profile_label(), "default");
        assert_eq!(config.server.port, 18001);
        assert_eq!(config.server.path, "/mcp");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "qwen-plus");
        assert_eq!(config.mcp_client.url, "http://localhost:18001/mcp");
        assert_eq!(config.agent.max_iterations, 5);
        assert!(!config.llm.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profile_prefix_wins() {
        let config = config_from(&[
            ("TOOLWIRE_PROFILE", "prod"),
            ("MCP_PORT", "9000"),
            ("PROD_MCP_PORT", "9100"),
            ("LLM_MODEL", "qwen-turbo"),
        ]);
        assert_eq!(config.profile, "PROD");
        assert_eq!(config.server.port, 9100);
        // Unprefixed key used when the profiled one is missing
        assert_eq!(config.llm.model, "qwen-turbo");
    }

    #[test]
    fn test_api_key_fallbacks() {
        let config = config_from(&[("DASHSCOPE_API_KEY", "sk-dash")]);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-dash"));

        let config = config_from(&[("LLM_API_KEY", "sk-main"), ("OPENAI_API_KEY", "sk-oa")]);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-main"));

        let config = config_from(&[("LLM_API_KEY", "")]);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = config_from(&[("MCP_PORT", "not-a-port"), ("AGENT_MAX_ITERATIONS", "-3")]);
        assert_eq!(config.server.port, 18001);
        assert_eq!(config.agent.max_iterations, 5);
    }

    #[test]
    fn test_parallel_flag() {
        assert!(config_from(&[("AGENT_PARALLEL_TOOLS", "true")]).agent.parallel_tools);
        assert!(!config_from(&[("AGENT_PARALLEL_TOOLS", "nope")]).agent.parallel_tools);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = config_from(&[("MCP_PATH", "mcp")]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidPath("mcp".to_string()))
        );

        let config = config_from(&[("MCP_PORT", "0")]);
        assert_eq!(config.validate(), Err(ConfigError::InvalidPort(0)));

        let config = config_from(&[("AGENT_MAX_ITERATIONS", "0")]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("AGENT_MAX_ITERATIONS"))
        );

        let config = config_from(&[("LLM_PROVIDER", "claude")]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownProvider("claude".to_string()))
        );
    }
}
