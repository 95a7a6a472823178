use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use zeroclick_core::config::{LlmConfig, LlmProvider};

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// One single-turn prompt sent to a language model.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), max_tokens: 1024, temperature: 0.0 }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client configuration error: {0}")]
    Configuration(String),
    #[error("llm request failed: {0}")]
    Network(String),
    #[error("llm api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("llm response could not be used: {0}")]
    Response(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &'static str;
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Builds the client for the configured provider.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let http = http_client(config.timeout_secs)?;
    let base_url = config.effective_base_url().to_string();
    let model = config.model.clone();

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Anthropic => {
            Arc::new(AnthropicClient::new(http, base_url, required_key(config)?, model))
        }
        LlmProvider::OpenAi => {
            Arc::new(OpenAiClient::new(http, base_url, required_key(config)?, model))
        }
        LlmProvider::Google => {
            Arc::new(GeminiClient::new(http, base_url, required_key(config)?, model))
        }
        LlmProvider::Ollama => Arc::new(OllamaClient::new(http, base_url, model)),
    };

    info!(
        event_name = "llm.client.ready",
        provider = client.provider(),
        model = %config.model,
        "language model client configured"
    );
    Ok(client)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| LlmError::Configuration(format!("failed to create HTTP client: {e}")))
}

fn required_key(config: &LlmConfig) -> Result<SecretString, LlmError> {
    config
        .api_key
        .as_ref()
        .filter(|key| !key.expose_secret().trim().is_empty())
        .cloned()
        .ok_or_else(|| {
            LlmError::Configuration(format!(
                "an api key is required for the {} provider",
                config.provider.as_str()
            ))
        })
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorDetail {
    Object { message: String },
    Text(String),
}

/// Maps a non-success response to `LlmError::Api`, preferring the
/// provider's `{"error": ...}` message over the raw body.
pub(crate) async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    api_error(status, &body)
}

pub(crate) fn api_error(status: u16, body: &str) -> LlmError {
    let message = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody { error: ApiErrorDetail::Object { message } }) => message,
        Ok(ApiErrorBody { error: ApiErrorDetail::Text(message) }) => message,
        Err(_) => body.trim().to_string(),
    };
    LlmError::Api { status, message }
}

pub(crate) fn network_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Network(format!("request timed out: {error}"))
    } else {
        LlmError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use zeroclick_core::config::{AppConfig, LlmProvider};

    use super::{api_error, build_client, CompletionRequest, LlmError};

    #[test]
    fn api_error_prefers_structured_message() {
        let error = api_error(401, r#"{"error":{"type":"auth","message":"invalid x-api-key"}}"#);
        assert!(matches!(
            error,
            LlmError::Api { status: 401, ref message } if message == "invalid x-api-key"
        ));

        let ollama = api_error(404, r#"{"error":"model 'llama3.1' not found"}"#);
        assert!(matches!(
            ollama,
            LlmError::Api { ref message, .. } if message.contains("llama3.1")
        ));

        let raw = api_error(502, "bad gateway\n");
        assert!(matches!(raw, LlmError::Api { ref message, .. } if message == "bad gateway"));
    }

    #[test]
    fn completion_request_builder_sets_limits() {
        let request = CompletionRequest::new("hi").max_tokens(256).temperature(0.3);
        assert_eq!(request.max_tokens, 256);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn factory_requires_key_for_hosted_providers() {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::OpenAi;
        config.api_key = None;

        assert!(matches!(build_client(&config), Err(LlmError::Configuration(_))));
    }

    #[test]
    fn factory_builds_keyless_ollama_client() {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::Ollama;
        config.api_key = None;

        let client = build_client(&config).expect("ollama client");
        assert_eq!(client.provider(), "ollama");
    }

    #[test]
    fn factory_selects_configured_provider() {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::Google;
        config.api_key = Some("key".to_string().into());

        let client = build_client(&config).expect("gemini client");
        assert_eq!(client.provider(), "google");
    }
}
