use std::sync::Arc;

use tracing::debug;
use zeroclick_core::query::{apply_filters, FilterError, FilterSpec, Filterable};

use crate::llm::{CompletionRequest, LlmClient};
use crate::structured::complete_structured;

const QUERY_MAX_TOKENS: u32 = 512;

/// Translates natural-language questions into a [`FilterSpec`].
#[derive(Clone)]
pub struct QueryAgent {
    client: Arc<dyn LlmClient>,
}

impl QueryAgent {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Falls back to `{"table": "deals"}` on any failure.
    pub async fn derive_filters(&self, query: &str) -> FilterSpec {
        let request = CompletionRequest::new(filter_prompt(query))
            .max_tokens(QUERY_MAX_TOKENS)
            .temperature(0.0);
        let client = self.client.as_ref();
        let spec = complete_structured(client, &request, "query", FilterSpec::fallback).await;

        debug!(event_name = "query.filters.derived", table = %spec.table());
        spec
    }

    pub fn apply<T>(&self, records: &[T], spec: &FilterSpec) -> Result<Vec<T>, FilterError>
    where
        T: Filterable + Clone,
    {
        apply_filters(records, spec)
    }
}

fn filter_prompt(query: &str) -> String {
    format!(
        r#"Convert this user query into structured filter parameters for a CRM database.

Database schema:
- contacts: id, name, company, email, phone, created_at
- deals: id, contact_id, deal_value, stage, next_step, follow_up_date, notes, created_at

Return ONLY a JSON object with these optional keys:
- table: "contacts" or "deals"
- company: string to match
- deal_value_min: minimum deal value
- deal_value_max: maximum deal value
- date_from: start date (YYYY-MM-DD)
- date_to: end date (YYYY-MM-DD)
- name_contains: partial name match
- stage: deal stage
- has_follow_up: boolean

Query: "{query}"

Return ONLY the JSON object."#
    )
}
