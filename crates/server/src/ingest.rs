//! Shared path behind the three ingestion endpoints: extract, summarize,
//! then write contact + activity + deal as one unit of work.

use tracing::info;
use zeroclick_agent::{CrmExtractor, DEFAULT_SUMMARY_WORDS};
use zeroclick_core::domain::activity::ActivityType;
use zeroclick_core::domain::extraction::CrmExtraction;
use zeroclick_core::domain::interaction::{Interaction, InteractionOutcome};
use zeroclick_db::{CrmRepositories, RepositoryError};

#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub extraction: CrmExtraction,
    pub summary: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IngestReport {
    pub summary: String,
    pub extraction: CrmExtraction,
    pub outcome: InteractionOutcome,
}

#[derive(Clone)]
pub struct Ingestor {
    extractor: CrmExtractor,
    repositories: CrmRepositories,
}

impl Ingestor {
    pub fn new(extractor: CrmExtractor, repositories: CrmRepositories) -> Self {
        Self { extractor, repositories }
    }

    pub async fn analyze(&self, text: &str) -> Analysis {
        let extraction = self.extractor.extract(text).await.normalized();
        let summary = self.extractor.summarize(text, DEFAULT_SUMMARY_WORDS).await;
        Analysis { extraction, summary }
    }

    pub async fn record(
        &self,
        activity_type: ActivityType,
        transcript: String,
        analysis: Analysis,
        correlation_id: &str,
    ) -> Result<IngestReport, RepositoryError> {
        let Analysis { extraction, summary } = analysis;
        let interaction = Interaction {
            activity_type,
            transcript,
            summary: summary.clone(),
            extraction: extraction.clone(),
        };
        let outcome = self.repositories.interactions.record(interaction).await?;

        info!(
            event_name = "ingest.recorded",
            correlation_id,
            activity_type = %activity_type,
            contact_id = outcome.contact_id.map(|id| id.0),
            activity_id = outcome.activity_id.map(|id| id.0),
            deal_id = outcome.deal_id.map(|id| id.0),
            "interaction recorded"
        );
        Ok(IngestReport { summary, extraction, outcome })
    }

    /// Analyzes `text` and records it verbatim as the activity transcript.
    pub async fn ingest(
        &self,
        activity_type: ActivityType,
        text: &str,
        correlation_id: &str,
    ) -> Result<IngestReport, RepositoryError> {
        let analysis = self.analyze(text).await;
        self.record(activity_type, text.to_string(), analysis, correlation_id).await
    }
}
