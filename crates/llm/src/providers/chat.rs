//! Minimal OpenAI-compatible `/chat/completions` client shared by the providers.

use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use toolwire_core::config::LlmConfig;
use toolwire_tool_runtime::LlmError;

/// Seconds to wait when a 429 carries no usable `retry-after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

pub(crate) struct ChatCompletions {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl ChatCompletions {
    pub(crate) fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::NotConfigured("LLM_API_KEY not set".into()))?;
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    /// Request body with the configured sampling parameters.
    pub(crate) fn body(&self, messages: Vec<Value>) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }

    /// POST `body` and return the decoded JSON response.
    pub(crate) async fn send(&self, body: &Value) -> Result<Value, LlmError> {
        debug!(model = %self.model, url = %self.url, "Sending chat completion request");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                401 | 403 => LlmError::AuthError,
                429 => LlmError::RateLimited {
                    retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
                },
                _ => LlmError::ApiError { status, message },
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn network_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::NetworkError(e.to_string())
        }
    }
}

/// `choices[0].message` of a completion response.
pub(crate) fn first_message(response: &Value) -> Result<&Value, LlmError> {
    let message = &response["choices"][0]["message"];
    if message.is_object() {
        Ok(message)
    } else {
        Err(LlmError::InvalidResponse("missing choices[0].message".into()))
    }
}
