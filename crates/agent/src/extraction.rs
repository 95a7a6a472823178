use std::sync::Arc;

use tracing::{debug, warn};
use zeroclick_core::domain::extraction::CrmExtraction;

use crate::llm::{CompletionRequest, LlmClient};
use crate::structured::complete_structured;

pub const DEFAULT_SUMMARY_WORDS: usize = 50;
const EXTRACTION_MAX_TOKENS: u32 = 1024;
const SUMMARY_MAX_TOKENS: u32 = 256;
const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_FALLBACK_CHARS: usize = 100;

/// Turns free text into a [`CrmExtraction`] and a short summary.
#[derive(Clone)]
pub struct CrmExtractor {
    client: Arc<dyn LlmClient>,
}

impl CrmExtractor {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Never fails: on any model or parse error the text lands in `notes`.
    pub async fn extract(&self, text: &str) -> CrmExtraction {
        let request = CompletionRequest::new(extraction_prompt(text))
            .max_tokens(EXTRACTION_MAX_TOKENS)
            .temperature(0.0);
        let extraction = complete_structured(self.client.as_ref(), &request, "extraction", || {
            CrmExtraction::fallback(text)
        })
        .await;

        debug!(
            event_name = "llm.extraction.completed",
            has_contact = extraction.contact_name.is_some(),
            has_deal_value = extraction.deal_value.is_some()
        );
        extraction
    }

    pub async fn summarize(&self, text: &str, max_words: usize) -> String {
        let request = CompletionRequest::new(summary_prompt(text, max_words))
            .max_tokens(SUMMARY_MAX_TOKENS)
            .temperature(SUMMARY_TEMPERATURE);

        match self.client.complete(&request).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => fallback_summary(text),
            Err(error) => {
                warn!(
                    event_name = "llm.summary.fallback",
                    provider = self.client.provider(),
                    error = %error,
                    "summary generation failed, truncating input instead"
                );
                fallback_summary(text)
            }
        }
    }
}

fn extraction_prompt(text: &str) -> String {
    format!(
        r#"You are an AI CRM assistant. Extract structured data from the following text.

Return ONLY a valid JSON object with these keys (use null for missing values):
- contact_name (string): Person's name
- company (string): Company name
- email (string): Email address if mentioned
- phone (string): Phone number if mentioned
- deal_value (number): Dollar amount of deal (just the number, no $ or commas)
- next_step (string): What needs to happen next
- follow_up_date (string): Date in YYYY-MM-DD format
- notes (string): Any additional relevant information

Text to analyze:
"{text}"

Return ONLY the JSON object, no other text."#
    )
}

fn summary_prompt(text: &str, max_words: usize) -> String {
    format!("Summarize this conversation in {max_words} words or less:\n\n{text}")
}

/// First 100 characters plus `...`, or the whole text when it is short.
pub fn fallback_summary(text: &str) -> String {
    if text.chars().count() > SUMMARY_FALLBACK_CHARS {
        let head: String = text.chars().take(SUMMARY_FALLBACK_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
