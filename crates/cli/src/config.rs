use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use toolwire_core::Config;

use crate::cli::CliArgs;

/// Chat settings loaded from TOML. Every field is optional; missing
/// values fall through to the environment-derived [`Config`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub mcp_url: Option<String>,
    pub system_prompt: Option<String>,
    pub max_iterations: Option<usize>,
}

impl CliConfig {
    /// Return the default config file path: ~/.config/toolwire/config.toml
    pub fn default_config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("could not determine user config directory")?;
        Ok(dir.join("toolwire").join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// A missing file yields an empty config.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };
        Self::load_from(&config_path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        debug!(?path, "Loading config");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Layer file values and flags over the environment-derived `env`.
    ///
    /// A file value only fills a field the environment left at its built-in
    /// default, so profile-prefixed and fallback keys (`DASHSCOPE_API_KEY`,
    /// `OPENAI_API_KEY`) still win. Flags override everything.
    pub fn resolve(self, args: &CliArgs, env: Config) -> Config {
        fn fill<T: PartialEq>(file: Option<T>, default: &T, current: &mut T) {
            if let Some(value) = file {
                if *current == *default {
                    *current = value;
                }
            }
        }
        fn flag<T>(value: Option<T>, current: &mut T) {
            if let Some(value) = value {
                *current = value;
            }
        }

        let defaults = Config::from_lookup(|_| None);
        let mut config = env;

        fill(self.provider, &defaults.llm.provider, &mut config.llm.provider);
        fill(self.model, &defaults.llm.model, &mut config.llm.model);
        fill(self.api_key.map(Some), &defaults.llm.api_key, &mut config.llm.api_key);
        fill(self.base_url, &defaults.llm.base_url, &mut config.llm.base_url);
        fill(self.mcp_url, &defaults.mcp_client.url, &mut config.mcp_client.url);
        fill(
            self.system_prompt.map(Some),
            &defaults.agent.system_prompt,
            &mut config.agent.system_prompt,
        );
        fill(
            self.max_iterations,
            &defaults.agent.max_iterations,
            &mut config.agent.max_iterations,
        );

        flag(args.provider.clone(), &mut config.llm.provider);
        flag(args.model.clone(), &mut config.llm.model);
        flag(args.api_key.clone().map(Some), &mut config.llm.api_key);
        flag(args.mcp_url.clone(), &mut config.mcp_client.url);
        flag(args.system_prompt.clone().map(Some), &mut config.agent.system_prompt);
        flag(args.max_iterations, &mut config.agent.max_iterations);
        flag(args.timeout, &mut config.mcp_client.timeout_secs);

        config.llm.provider = config.llm.provider.to_lowercase();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn defaults() -> Config {
        Config::from_lookup(|_| None)
    }

    fn env(pairs: &[(&str, &str)]) -> Config {
        let vars: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.provider.is_none());
        assert!(config.mcp_url.is_none());
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "provider = \"prompted\"\nmodel = \"qwen-max\"\nmcp_url = \"http://tools:9000/mcp\"\nmax_iterations = 3"
        )
        .unwrap();

        let config = CliConfig::load_from(file.path()).unwrap();
        assert_eq!(config.provider.as_deref(), Some("prompted"));
        assert_eq!(config.model.as_deref(), Some("qwen-max"));
        assert_eq!(config.max_iterations, Some(3));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "provider = ").unwrap();
        assert!(CliConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = CliConfig {
            provider: Some("Prompted".into()),
            mcp_url: Some("http://tools:9000/mcp".into()),
            api_key: Some("sk-file".into()),
            ..Default::default()
        };
        let config = file.resolve(&CliArgs::default(), defaults());
        assert_eq!(config.llm.provider, "prompted");
        assert_eq!(config.mcp_client.url, "http://tools:9000/mcp");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.llm.model, "qwen-plus");
    }

    #[test]
    fn test_flags_override_file() {
        let file = CliConfig {
            model: Some("from-file".into()),
            max_iterations: Some(3),
            ..Default::default()
        };
        let args = CliArgs {
            model: Some("from-flag".into()),
            max_iterations: Some(8),
            timeout: Some(2),
            system_prompt: Some("be brief".into()),
            ..Default::default()
        };
        let config = file.resolve(&args, defaults());
        assert_eq!(config.llm.model, "from-flag");
        assert_eq!(config.agent.max_iterations, 8);
        assert_eq!(config.mcp_client.timeout_secs, 2);
        assert_eq!(config.agent.system_prompt.as_deref(), Some("be brief"));
    }

    #[test]
    fn test_env_beats_file_through_fallback_and_profile_keys() {
        let file = CliConfig {
            api_key: Some("sk-file".into()),
            model: Some("file-model".into()),
            mcp_url: Some("http://file:9000/mcp".into()),
            ..Default::default()
        };
        let environment = env(&[
            ("DASHSCOPE_API_KEY", "sk-env"),
            ("TOOLWIRE_PROFILE", "PROD"),
            ("PROD_LLM_MODEL", "env-model"),
        ]);

        let config = file.resolve(&CliArgs::default(), environment);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.model, "env-model");
        // Nothing in the environment for the URL, so the file applies.
        assert_eq!(config.mcp_client.url, "http://file:9000/mcp");
    }

    #[test]
    fn test_flags_beat_env() {
        let args = CliArgs {
            api_key: Some("sk-flag".into()),
            provider: Some("Prompted".into()),
            ..Default::default()
        };
        let config = CliConfig::default().resolve(&args, env(&[("OPENAI_API_KEY", "sk-env")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-flag"));
        assert_eq!(config.llm.provider, "prompted");
    }
}
