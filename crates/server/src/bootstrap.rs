use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use zeroclick_agent::speech::{SpeechError, WhisperApiTranscriber};
use zeroclick_agent::{build_client, CrmExtractor, LlmError, QueryAgent};
use zeroclick_core::config::AppConfig;
use zeroclick_db::{connect_with_settings, migrations, CrmRepositories, DbPool};

use crate::api::AppState;
use crate::ingest::Ingestor;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("language model setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("speech setup failed: {0}")]
    Speech(#[source] SpeechError),
}

/// Wires every collaborator from an already validated configuration.
pub async fn bootstrap(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let llm = build_client(&config.llm).map_err(BootstrapError::Llm)?;
    let transcriber =
        WhisperApiTranscriber::from_config(&config.speech).map_err(BootstrapError::Speech)?;
    let repositories = CrmRepositories::sql(db_pool.clone());

    let state = AppState {
        ingestor: Ingestor::new(CrmExtractor::new(llm.clone()), repositories.clone()),
        query_agent: QueryAgent::new(llm),
        transcriber: Arc::new(transcriber),
        repositories,
    };

    Ok(Application { config, db_pool, state })
}
