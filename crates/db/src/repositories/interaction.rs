use tracing::debug;

use zeroclick_core::domain::interaction::{Interaction, InteractionOutcome};

use super::{activity, contact, deal, InteractionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInteractionRepository {
    pool: DbPool,
}

impl SqlInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl InteractionRepository for SqlInteractionRepository {
    async fn record(
        &self,
        interaction: Interaction,
    ) -> Result<InteractionOutcome, RepositoryError> {
        // Write lock up front: the contact lookup must not need an upgrade.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let contact_id = match interaction.contact() {
            Some(new_contact) => Some(contact::find_or_insert(&mut tx, &new_contact).await?),
            None => None,
        };

        let logged = activity::insert(&mut tx, &interaction.activity(contact_id)).await?;

        let deal_id = match contact_id.and_then(|id| interaction.deal(id)) {
            Some(new_deal) => Some(deal::insert(&mut tx, &new_deal).await?.id),
            None => None,
        };

        tx.commit().await?;

        debug!(
            event_name = "db.interaction.recorded",
            activity_type = interaction.activity_type.as_str(),
            contact_id = contact_id.map(|id| id.0),
            activity_id = logged.id.0,
            deal_id = deal_id.map(|id| id.0),
            "interaction committed"
        );

        Ok(InteractionOutcome { contact_id, activity_id: Some(logged.id), deal_id })
    }
}

#[cfg(test)]
mod tests {
    use zeroclick_core::domain::activity::ActivityType;
    use zeroclick_core::domain::extraction::CrmExtraction;
    use zeroclick_core::domain::interaction::Interaction;

    use crate::repositories::CrmRepositories;
    use crate::{connect_with_settings, migrations};

    async fn repositories() -> CrmRepositories {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        CrmRepositories::sql(pool)
    }

    fn call(extraction: CrmExtraction) -> Interaction {
        Interaction {
            activity_type: ActivityType::Call,
            transcript: "Sarah wants the enterprise plan".to_string(),
            summary: "Enterprise plan interest".to_string(),
            extraction,
        }
    }

    #[tokio::test]
    async fn records_contact_activity_and_deal_together() {
        let repos = repositories().await;
        let outcome = repos
            .interactions
            .record(call(CrmExtraction {
                contact_name: Some("Sarah Johnson".to_string()),
                company: Some("Acme Corp".to_string()),
                deal_value: Some(10_000.0),
                next_step: Some("Send proposal".to_string()),
                follow_up_date: Some("2026-10-20".to_string()),
                ..CrmExtraction::default()
            }))
            .await
            .expect("record");

        let contact_id = outcome.contact_id.expect("contact resolved");
        assert!(outcome.activity_id.is_some());
        assert!(outcome.deal_id.is_some());

        let deals = repos.deals.list_for_contact(contact_id).await.expect("deals");
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].follow_up_date.as_deref(), Some("2026-10-20"));
        let activities = repos.activities.list_for_contact(contact_id).await.expect("acts");
        assert_eq!(activities[0].summary.as_deref(), Some("Enterprise plan interest"));
    }

    #[tokio::test]
    async fn repeated_interactions_reuse_the_contact() {
        let repos = repositories().await;
        let extraction = CrmExtraction {
            contact_name: Some("Michael Chen".to_string()),
            company: Some("TechStart Inc".to_string()),
            ..CrmExtraction::default()
        };

        let first = repos.interactions.record(call(extraction.clone())).await.expect("first");
        let second = repos.interactions.record(call(extraction)).await.expect("second");

        assert_eq!(first.contact_id, second.contact_id);
        assert_ne!(first.activity_id, second.activity_id);
        assert_eq!(first.deal_id, None);
        assert_eq!(repos.contacts.list().await.expect("contacts").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_interactions_on_a_file_database_all_commit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("crm.db").display());
        let pool = connect_with_settings(&url, 5, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repos = CrmRepositories::sql(pool.clone());

        let handles: Vec<_> = (0..20)
            .map(|n| {
                let repos = repos.clone();
                tokio::spawn(async move {
                    repos
                        .interactions
                        .record(call(CrmExtraction {
                            contact_name: Some(format!("Contact {n}")),
                            company: Some("Acme Corp".to_string()),
                            deal_value: Some(1_000.0),
                            ..CrmExtraction::default()
                        }))
                        .await
                })
            })
            .collect();

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(error) = handle.await.expect("task should not panic") {
                failures.push(error.to_string());
            }
        }

        assert!(failures.is_empty(), "concurrent ingests failed: {failures:?}");
        assert_eq!(repos.contacts.list().await.expect("contacts").len(), 20);
        assert_eq!(repos.activities.list().await.expect("activities").len(), 20);
        assert_eq!(repos.deals.list().await.expect("deals").len(), 20);
        pool.close().await;
    }

    #[tokio::test]
    async fn anonymous_text_logs_activity_only() {
        let repos = repositories().await;
        let outcome = repos
            .interactions
            .record(call(CrmExtraction {
                deal_value: Some(5_000.0),
                ..CrmExtraction::fallback("no names here")
            }))
            .await
            .expect("record");

        assert_eq!(outcome.contact_id, None);
        assert_eq!(outcome.deal_id, None);
        assert!(repos.deals.list().await.expect("deals").is_empty());
        assert_eq!(repos.activities.list().await.expect("activities").len(), 1);
    }
}
