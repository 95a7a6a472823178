pub mod config;
pub mod domain;
pub mod email;
pub mod errors;
pub mod query;

pub use config::{AppConfig, ConfigError, LlmProvider, LoadOptions, LogFormat};
pub use domain::activity::{Activity, ActivityId, ActivityRecord, ActivityType, NewActivity};
pub use domain::contact::{Contact, ContactId, NewContact};
pub use domain::deal::{Deal, DealId, DealRecord, NewDeal, DEFAULT_STAGE};
pub use domain::extraction::CrmExtraction;
pub use domain::interaction::{Interaction, InteractionOutcome};
pub use email::{ParsedEmail, SampleEmail};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use query::{apply_filters, FilterError, FilterSpec, Filterable, QueryTable};
