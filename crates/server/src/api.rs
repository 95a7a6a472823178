//! HTTP surface of the CRM.
//!
//! Every handler mints a correlation id, does its work through the shared
//! [`AppState`] collaborators and maps failures to `{"detail": ...}`.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;
use zeroclick_agent::speech::{AudioInput, Transcriber};
use zeroclick_agent::QueryAgent;
use zeroclick_core::domain::activity::{Activity, ActivityId, ActivityRecord, ActivityType};
use zeroclick_core::domain::contact::{Contact, ContactId};
use zeroclick_core::domain::deal::{Deal, DealId, DealRecord};
use zeroclick_core::domain::extraction::CrmExtraction;
use zeroclick_core::email::{parse_email, sample_emails, ParsedEmail, SampleEmail};
use zeroclick_core::errors::DomainError;
use zeroclick_core::query::{FilterSpec, QueryTable};
use zeroclick_db::CrmRepositories;

use crate::error::ApiError;
use crate::ingest::{IngestReport, Ingestor};

const DEFAULT_AUDIO_FILE_NAME: &str = "audio.wav";

#[derive(Clone)]
pub struct AppState {
    pub repositories: CrmRepositories,
    pub ingestor: Ingestor,
    pub query_agent: QueryAgent,
    pub transcriber: Arc<dyn Transcriber>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/upload_audio", post(upload_audio))
        .route("/process_text", post(process_text))
        .route("/process_email", post(process_email))
        .route("/contacts", get(list_contacts))
        .route("/contacts/{id}", get(get_contact))
        .route("/contacts/{id}/deals", get(list_contact_deals))
        .route("/contacts/{id}/activities", get(list_contact_activities))
        .route("/deals", get(list_deals))
        .route("/activities", get(list_activities))
        .route("/query", post(natural_language_query))
        .route("/sample_emails", get(get_sample_emails))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Cross-cutting layers applied once around the merged router.
pub fn with_middleware(router: Router) -> Router {
    router.layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http())
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Deserialize)]
pub struct TextInput {
    pub text: String,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    ActivityType::Manual.as_str().to_string()
}

#[derive(Debug, Deserialize)]
pub struct EmailInput {
    pub email_text: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryInput {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_email: Option<ParsedEmail>,
    pub summary: String,
    pub extracted_data: CrmExtraction,
    pub contact_id: Option<ContactId>,
    pub activity_id: Option<ActivityId>,
    pub deal_id: Option<DealId>,
}

impl From<IngestReport> for IngestResponse {
    fn from(report: IngestReport) -> Self {
        Self {
            success: true,
            transcript: None,
            parsed_email: None,
            summary: report.summary,
            extracted_data: report.extraction,
            contact_id: report.outcome.contact_id,
            activity_id: report.outcome.activity_id,
            deal_id: report.outcome.deal_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QueryResults {
    Contacts(Vec<Contact>),
    Deals(Vec<DealRecord>),
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub filters_applied: FilterSpec,
    pub results: QueryResults,
    pub count: usize,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Zero-Click CRM API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "upload_audio": "/upload_audio",
            "process_text": "/process_text",
            "process_email": "/process_email",
            "contacts": "/contacts",
            "contact": "/contacts/{id}",
            "deals": "/deals",
            "activities": "/activities",
            "query": "/query",
            "sample_emails": "/sample_emails"
        }
    }))
}

pub async fn upload_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let correlation_id = correlation_id();

    let mut audio = None;
    let mut language = None;
    while let Some(field) =
        multipart.next_field().await.map_err(|e| ApiError::integration(e, &correlation_id))?
    {
        match field.name().map(str::to_string).as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(DEFAULT_AUDIO_FILE_NAME)
                    .to_string();
                let bytes =
                    field.bytes().await.map_err(|e| ApiError::integration(e, &correlation_id))?;
                audio = Some(AudioInput::new(bytes.to_vec(), file_name));
            }
            // Optional per-upload override of the configured speech language.
            Some("language") => {
                let value =
                    field.text().await.map_err(|e| ApiError::integration(e, &correlation_id))?;
                language = Some(value.trim().to_string()).filter(|value| !value.is_empty());
            }
            _ => {}
        }
    }
    let Some(mut audio) = audio else {
        return Err(ApiError::new(
            DomainError::InvariantViolation("multipart field `file` is required".to_string()),
            &correlation_id,
        ));
    };
    if let Some(language) = language {
        audio = audio.with_language(language);
    }

    info!(
        event_name = "ingest.audio.received",
        correlation_id = %correlation_id,
        file_name = %audio.file_name,
        language = audio.language.as_deref().unwrap_or("auto"),
        bytes = audio.bytes.len(),
        "transcribing uploaded audio"
    );
    let transcription = state
        .transcriber
        .transcribe(audio)
        .await
        .map_err(|e| ApiError::integration(e, &correlation_id))?;
    let transcript = transcription.text;

    let report = state
        .ingestor
        .ingest(ActivityType::Call, &transcript, &correlation_id)
        .await
        .map_err(|e| ApiError::persistence(e, &correlation_id))?;

    Ok(Json(IngestResponse { transcript: Some(transcript), ..IngestResponse::from(report) }))
}

pub async fn process_text(
    State(state): State<AppState>,
    Json(input): Json<TextInput>,
) -> Result<Json<IngestResponse>, ApiError> {
    let correlation_id = correlation_id();
    let activity_type = input.source.parse::<ActivityType>().unwrap_or_else(|error| {
        warn!(
            event_name = "ingest.text.unknown_source",
            correlation_id = %correlation_id,
            source = %input.source,
            error = %error,
            "recording unknown source as manual"
        );
        ActivityType::Manual
    });

    let report = state
        .ingestor
        .ingest(activity_type, &input.text, &correlation_id)
        .await
        .map_err(|e| ApiError::persistence(e, &correlation_id))?;

    Ok(Json(IngestResponse::from(report)))
}

pub async fn process_email(
    State(state): State<AppState>,
    Json(input): Json<EmailInput>,
) -> Result<Json<IngestResponse>, ApiError> {
    let correlation_id = correlation_id();
    let parsed = parse_email(&input.email_text);
    let text = parsed
        .body
        .as_deref()
        .filter(|body| !body.trim().is_empty())
        .unwrap_or(&input.email_text)
        .to_string();

    let mut analysis = state.ingestor.analyze(&text).await;
    analysis.extraction.fill_sender(parsed.from_name.as_deref(), parsed.from_email.as_deref());

    let report = state
        .ingestor
        .record(ActivityType::Email, text, analysis, &correlation_id)
        .await
        .map_err(|e| ApiError::persistence(e, &correlation_id))?;

    Ok(Json(IngestResponse { parsed_email: Some(parsed), ..IngestResponse::from(report) }))
}

pub async fn list_contacts(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let correlation_id = correlation_id();
    let contacts = state
        .repositories
        .contacts
        .list()
        .await
        .map_err(|e| ApiError::persistence(e, &correlation_id))?;
    Ok(Json(json!({ "contacts": contacts })))
}

pub async fn list_deals(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let correlation_id = correlation_id();
    let deals = state
        .repositories
        .deals
        .list()
        .await
        .map_err(|e| ApiError::persistence(e, &correlation_id))?;
    Ok(Json(json!({ "deals": deals })))
}

pub async fn list_activities(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let correlation_id = correlation_id();
    let activities: Vec<ActivityRecord> = state
        .repositories
        .activities
        .list()
        .await
        .map_err(|e| ApiError::persistence(e, &correlation_id))?;
    Ok(Json(json!({ "activities": activities })))
}

async fn require_contact(
    repositories: &CrmRepositories,
    id: i64,
    correlation_id: &str,
) -> Result<Contact, ApiError> {
    repositories
        .contacts
        .find_by_id(ContactId(id))
        .await
        .map_err(|e| ApiError::persistence(e, correlation_id))?
        .ok_or_else(|| ApiError::not_found(format!("Contact {id} not found"), correlation_id))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let correlation_id = correlation_id();
    let contact = require_contact(&state.repositories, id, &correlation_id).await?;
    Ok(Json(json!({ "contact": contact })))
}

pub async fn list_contact_deals(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let correlation_id = correlation_id();
    let contact = require_contact(&state.repositories, id, &correlation_id).await?;
    let deals: Vec<Deal> = state
        .repositories
        .deals
        .list_for_contact(contact.id)
        .await
        .map_err(|e| ApiError::persistence(e, &correlation_id))?;
    Ok(Json(json!({ "deals": deals })))
}

pub async fn list_contact_activities(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let correlation_id = correlation_id();
    let contact = require_contact(&state.repositories, id, &correlation_id).await?;
    let activities: Vec<Activity> = state
        .repositories
        .activities
        .list_for_contact(contact.id)
        .await
        .map_err(|e| ApiError::persistence(e, &correlation_id))?;
    Ok(Json(json!({ "activities": activities })))
}

pub async fn natural_language_query(
    State(state): State<AppState>,
    Json(input): Json<QueryInput>,
) -> Result<Json<QueryResponse>, ApiError> {
    let correlation_id = correlation_id();
    let filters = state.query_agent.derive_filters(&input.query).await;

    let results = match filters.table() {
        QueryTable::Contacts => {
            let contacts = state
                .repositories
                .contacts
                .list()
                .await
                .map_err(|e| ApiError::persistence(e, &correlation_id))?;
            let matched = state
                .query_agent
                .apply(&contacts, &filters)
                .map_err(|e| ApiError::new(e, &correlation_id))?;
            QueryResults::Contacts(matched)
        }
        QueryTable::Deals => {
            let deals = state
                .repositories
                .deals
                .list()
                .await
                .map_err(|e| ApiError::persistence(e, &correlation_id))?;
            let matched = state
                .query_agent
                .apply(&deals, &filters)
                .map_err(|e| ApiError::new(e, &correlation_id))?;
            QueryResults::Deals(matched)
        }
    };

    let count = match &results {
        QueryResults::Contacts(rows) => rows.len(),
        QueryResults::Deals(rows) => rows.len(),
    };
    info!(
        event_name = "query.executed",
        correlation_id = %correlation_id,
        table = %filters.table(),
        count,
        "natural language query answered"
    );
    Ok(Json(QueryResponse { query: input.query, filters_applied: filters, results, count }))
}

pub async fn get_sample_emails() -> Json<SampleEmailsResponse> {
    Json(SampleEmailsResponse { samples: sample_emails() })
}

#[derive(Debug, Serialize)]
pub struct SampleEmailsResponse {
    pub samples: Vec<SampleEmail>,
}
