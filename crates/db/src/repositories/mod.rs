use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use zeroclick_core::domain::activity::{Activity, ActivityRecord, NewActivity};
use zeroclick_core::domain::contact::{Contact, ContactId, NewContact};
use zeroclick_core::domain::deal::{Deal, DealRecord, NewDeal};
use zeroclick_core::domain::interaction::{Interaction, InteractionOutcome};

pub mod activity;
pub mod contact;
pub mod deal;
pub mod interaction;
pub mod memory;

pub use activity::SqlActivityRepository;
pub use contact::SqlContactRepository;
pub use deal::SqlDealRepository;
pub use interaction::SqlInteractionRepository;
pub use memory::InMemoryCrmStore;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Returns the first contact with exactly this name (and company, when
    /// given), inserting a new one when none matches.
    async fn find_or_create(&self, contact: NewContact) -> Result<ContactId, RepositoryError>;
    async fn find_by_id(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Contact>, RepositoryError>;
}

#[async_trait]
pub trait DealRepository: Send + Sync {
    async fn create(&self, deal: NewDeal) -> Result<Deal, RepositoryError>;
    async fn list(&self) -> Result<Vec<DealRecord>, RepositoryError>;
    async fn list_for_contact(&self, contact_id: ContactId) -> Result<Vec<Deal>, RepositoryError>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, activity: NewActivity) -> Result<Activity, RepositoryError>;
    async fn list(&self) -> Result<Vec<ActivityRecord>, RepositoryError>;
    async fn list_for_contact(
        &self,
        contact_id: ContactId,
    ) -> Result<Vec<Activity>, RepositoryError>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Resolves the contact, logs the activity and opens a deal when the
    /// extraction warrants one, as a single unit of work.
    async fn record(&self, interaction: Interaction)
        -> Result<InteractionOutcome, RepositoryError>;
}

/// Every repository the CRM needs, backed by one store.
#[derive(Clone)]
pub struct CrmRepositories {
    pub contacts: Arc<dyn ContactRepository>,
    pub deals: Arc<dyn DealRepository>,
    pub activities: Arc<dyn ActivityRepository>,
    pub interactions: Arc<dyn InteractionRepository>,
}

impl CrmRepositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            contacts: Arc::new(SqlContactRepository::new(pool.clone())),
            deals: Arc::new(SqlDealRepository::new(pool.clone())),
            activities: Arc::new(SqlActivityRepository::new(pool.clone())),
            interactions: Arc::new(SqlInteractionRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryCrmStore::default());
        Self {
            contacts: store.clone(),
            deals: store.clone(),
            activities: store.clone(),
            interactions: store,
        }
    }
}

pub(crate) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub(crate) fn decode_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
