//! `/health`: a live database probe plus the readiness of the language
//! model and speech collaborators as configured at startup.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use zeroclick_core::config::{AppConfig, LlmConfig, SpeechConfig};
use zeroclick_db::{ping, DbPool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ready,
    Degraded,
    Unconfigured,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: CheckStatus,
    pub detail: String,
}

impl HealthCheck {
    fn new(status: CheckStatus, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }
}

/// Outbound collaborators never change after bootstrap, so their checks are
/// computed once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Collaborators {
    pub llm: HealthCheck,
    pub speech: HealthCheck,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { llm: llm_check(&config.llm), speech: speech_check(&config.speech) }
    }
}

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    collaborators: Collaborators,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: CheckStatus,
    pub database: HealthCheck,
    pub llm: HealthCheck,
    pub speech: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, config: &AppConfig) -> Router {
    let state = HealthState { db_pool, collaborators: Collaborators::from_config(config) };
    Router::new().route("/health", get(health)).with_state(state)
}

/// Ready when the database answers and the model can be called; audio
/// upload is optional, so an unconfigured transcriber does not degrade it.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let Collaborators { llm, speech } = state.collaborators;
    let ready = database.status == CheckStatus::Ready && llm.status == CheckStatus::Ready;

    let payload = HealthResponse {
        status: if ready { CheckStatus::Ready } else { CheckStatus::Degraded },
        database,
        llm,
        speech,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match ping(pool).await {
        Ok(()) => HealthCheck::new(CheckStatus::Ready, "database query succeeded"),
        Err(error) => {
            HealthCheck::new(CheckStatus::Degraded, format!("database query failed: {error}"))
        }
    }
}

fn llm_check(llm: &LlmConfig) -> HealthCheck {
    let provider = llm.provider.as_str();
    if llm.provider.requires_api_key() && !llm.has_api_key() {
        return HealthCheck::new(
            CheckStatus::Degraded,
            format!("no api key configured for {provider}"),
        );
    }
    HealthCheck::new(
        CheckStatus::Ready,
        format!("{provider} model `{}` at {}", llm.model, llm.effective_base_url()),
    )
}

fn speech_check(speech: &SpeechConfig) -> HealthCheck {
    if speech.has_api_key() {
        HealthCheck::new(
            CheckStatus::Ready,
            format!("transcription via `{}` at {}", speech.model, speech.base_url),
        )
    } else {
        HealthCheck::new(CheckStatus::Unconfigured, "no speech api key; /upload_audio is disabled")
    }
}
