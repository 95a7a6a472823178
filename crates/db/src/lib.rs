pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use fixtures::{ContactSeedInfo, DemoSeedDataset, SeedResult, VerificationResult};
pub use repositories::{
    ActivityRepository, ContactRepository, CrmRepositories, DealRepository, InMemoryCrmStore,
    InteractionRepository, RepositoryError,
};
