use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_from_response, network_error, CompletionRequest, LlmClient, LlmError};

/// Local Ollama chat client. Needs no api key.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(http: Client, base_url: String, model: String) -> Self {
        Self { http, base_url, model }
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

fn message_text(response: ChatResponse) -> Result<String, LlmError> {
    match response.message {
        Some(message) if !message.content.is_empty() => Ok(message.content),
        _ => Err(LlmError::Response("ollama response contained no message".into())),
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(
            event_name = "llm.request",
            provider = "ollama",
            model = %self.model,
            max_tokens = request.max_tokens
        );

        let response =
            self.http.post(&url).json(&self.body(request)).send().await.map_err(network_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Response(format!("failed to parse response: {e}")))?;
        message_text(parsed)
    }
}
