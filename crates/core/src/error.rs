use thiserror::Error;

/// Rejected configuration values, reported before any listener or client starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port: {0}")]
    InvalidPort(u16),

    #[error("endpoint path must start with '/': {0}")]
    InvalidPath(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),
}
