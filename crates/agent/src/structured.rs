//! Prompt → JSON object → typed value, with a caller-supplied fallback.
//!
//! Language models are asked to answer with a bare JSON object but often
//! wrap it in a Markdown fence. Everything here tolerates that and nothing
//! else: prose around the object, arrays, or scalars are failures.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

#[derive(Debug, Error)]
pub enum StructuredError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model output is not valid json: {0}")]
    InvalidJson(serde_json::Error),
    #[error("model output is a json {0}, expected an object")]
    NotAnObject(&'static str),
    #[error("model output has the wrong shape: {0}")]
    Shape(serde_json::Error),
}

/// Removes a leading ```` ```json ```` or ```` ``` ```` fence and a trailing
/// ```` ``` ````, then trims.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut content = raw.trim();
    if let Some(rest) = content.strip_prefix("```json") {
        content = rest;
    }
    if let Some(rest) = content.strip_prefix("```") {
        content = rest;
    }
    if let Some(rest) = content.strip_suffix("```") {
        content = rest;
    }
    content.trim()
}

pub fn parse_json_object<T: DeserializeOwned>(raw: &str) -> Result<T, StructuredError> {
    let value: Value =
        serde_json::from_str(strip_code_fences(raw)).map_err(StructuredError::InvalidJson)?;
    if !value.is_object() {
        return Err(StructuredError::NotAnObject(json_kind(&value)));
    }
    serde_json::from_value(value).map_err(StructuredError::Shape)
}

pub async fn try_complete_structured<T: DeserializeOwned>(
    client: &dyn LlmClient,
    request: &CompletionRequest,
) -> Result<T, StructuredError> {
    let raw = client.complete(request).await?;
    parse_json_object(&raw)
}

/// Runs the prompt and parses the answer; any failure is logged and
/// replaced by `fallback()`.
pub async fn complete_structured<T, F>(
    client: &dyn LlmClient,
    request: &CompletionRequest,
    purpose: &'static str,
    fallback: F,
) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match try_complete_structured(client, request).await {
        Ok(value) => value,
        Err(error) => {
            warn!(
                event_name = "llm.structured.fallback",
                purpose,
                provider = client.provider(),
                error = %error,
                "structured completion failed, using fallback"
            );
            fallback()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
