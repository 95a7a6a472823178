use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// Replays canned answers in order and records every request it receives.
pub struct ScriptedLlm {
    answers: Mutex<VecDeque<Result<String, LlmError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(answers: Vec<Result<String, LlmError>>) -> Self {
        Self { answers: Mutex::new(answers.into()), requests: Mutex::new(Vec::new()) }
    }

    /// Answers each prompt with the next reply; fails once the script runs dry.
    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|reply| Ok(reply.to_string())).collect())
    }

    pub fn answering(answer: &str) -> Self {
        Self::new(vec![Ok(answer.to_string())])
    }

    pub fn failing() -> Self {
        Self::new(vec![Err(LlmError::Network("connection refused".to_string()))])
    }

    pub fn prompts(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().expect("requests lock").push(request.clone());
        self.answers
            .lock()
            .expect("answers lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Response("no scripted answer left".to_string())))
    }
}
