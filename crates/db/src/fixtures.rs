use chrono::{Days, NaiveDate};

use zeroclick_core::domain::contact::{ContactId, NewContact};
use zeroclick_core::domain::deal::{DealId, NewDeal};

use crate::repositories::{CrmRepositories, RepositoryError};

/// Demo pipeline: three contacts, each with one open deal.
const DEMO_CONTACTS: &[DemoContactContract] = &[
    DemoContactContract {
        name: "Sarah Johnson",
        company: "Acme Corp",
        email: "sarah.johnson@acmecorp.com",
        phone: "+1-555-0101",
        deal_value: 10_000.0,
        next_step: "Send enterprise plan proposal",
        follow_up_days: 2,
        notes: "Very interested in enterprise features. Budget approved.",
    },
    DemoContactContract {
        name: "Michael Chen",
        company: "TechStart Inc",
        email: "mchen@techstart.io",
        phone: "+1-555-0102",
        deal_value: 5_000.0,
        next_step: "Schedule product demo",
        follow_up_days: 3,
        notes: "Startup founder, looking for scalable solution.",
    },
    DemoContactContract {
        name: "Emily Rodriguez",
        company: "Global Solutions",
        email: "emily.r@globalsol.com",
        phone: "+1-555-0103",
        deal_value: 15_000.0,
        next_step: "Final contract review",
        follow_up_days: 1,
        notes: "Large enterprise client. Multiple stakeholders.",
    },
];

struct DemoContactContract {
    name: &'static str,
    company: &'static str,
    email: &'static str,
    phone: &'static str,
    deal_value: f64,
    next_step: &'static str,
    follow_up_days: u64,
    notes: &'static str,
}

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Loads the demo contacts and their deals. Contacts resolve through
    /// find-or-create and a deal is skipped when its contact already has one
    /// with the same next step, so loading twice changes nothing.
    pub async fn load(
        repos: &CrmRepositories,
        today: NaiveDate,
    ) -> Result<SeedResult, RepositoryError> {
        let mut contacts_seeded = Vec::with_capacity(DEMO_CONTACTS.len());

        for seed in DEMO_CONTACTS {
            let contact_id = repos
                .contacts
                .find_or_create(
                    NewContact::new(seed.name)
                        .with_company(seed.company)
                        .with_email(seed.email)
                        .with_phone(seed.phone),
                )
                .await?;

            let existing = repos.deals.list_for_contact(contact_id).await?;
            let already_seeded =
                existing.iter().any(|deal| deal.next_step.as_deref() == Some(seed.next_step));

            let deal_id = if already_seeded {
                None
            } else {
                let follow_up = today
                    .checked_add_days(Days::new(seed.follow_up_days))
                    .unwrap_or(today)
                    .format("%Y-%m-%d")
                    .to_string();
                let deal = repos
                    .deals
                    .create(NewDeal {
                        deal_value: Some(seed.deal_value),
                        next_step: Some(seed.next_step.to_string()),
                        follow_up_date: Some(follow_up),
                        notes: Some(seed.notes.to_string()),
                        ..NewDeal::new(contact_id)
                    })
                    .await?;
                Some(deal.id)
            };

            contacts_seeded.push(ContactSeedInfo {
                name: seed.name,
                company: seed.company,
                contact_id,
                deal_id,
            });
        }

        Ok(SeedResult { contacts_seeded })
    }

    /// Checks that every demo contact and its deal are present.
    pub async fn verify(repos: &CrmRepositories) -> Result<VerificationResult, RepositoryError> {
        let contacts = repos.contacts.list().await?;
        let deals = repos.deals.list().await?;
        let mut checks = Vec::with_capacity(DEMO_CONTACTS.len() * 2);

        for seed in DEMO_CONTACTS {
            let contact = contacts
                .iter()
                .find(|contact| contact.is_same_person(seed.name, Some(seed.company)));
            checks.push((seed.name, contact.is_some()));

            let has_deal = contact
                .map(|contact| {
                    deals.iter().any(|record| {
                        record.deal.contact_id == contact.id
                            && record.deal.next_step.as_deref() == Some(seed.next_step)
                    })
                })
                .unwrap_or(false);
            checks.push((seed.next_step, has_deal));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Sum of the demo deal values.
    pub fn pipeline_total() -> f64 {
        DEMO_CONTACTS.iter().map(|seed| seed.deal_value).sum()
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub contacts_seeded: Vec<ContactSeedInfo>,
}

impl SeedResult {
    pub fn deals_created(&self) -> usize {
        self.contacts_seeded.iter().filter(|info| info.deal_id.is_some()).count()
    }
}

#[derive(Debug)]
pub struct ContactSeedInfo {
    pub name: &'static str,
    pub company: &'static str,
    pub contact_id: ContactId,
    pub deal_id: Option<DealId>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{DemoSeedDataset, DEMO_CONTACTS};
    use crate::repositories::CrmRepositories;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date")
    }

    #[tokio::test]
    async fn load_seeds_contacts_with_follow_ups() {
        let repos = CrmRepositories::in_memory();
        let result = DemoSeedDataset::load(&repos, today()).await.expect("load");

        assert_eq!(result.contacts_seeded.len(), DEMO_CONTACTS.len());
        assert_eq!(result.deals_created(), 3);

        let deals = repos.deals.list().await.expect("deals");
        let emily = deals
            .iter()
            .find(|record| record.deal.next_step.as_deref() == Some("Final contract review"))
            .expect("emily's deal");
        assert_eq!(emily.deal.follow_up_date.as_deref(), Some("2026-10-19"));
        assert_eq!(emily.deal.deal_value, Some(15_000.0));
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let repos = CrmRepositories::in_memory();
        let first = DemoSeedDataset::load(&repos, today()).await.expect("first");
        let second = DemoSeedDataset::load(&repos, today()).await.expect("second");

        assert_eq!(second.deals_created(), 0);
        for (a, b) in first.contacts_seeded.iter().zip(&second.contacts_seeded) {
            assert_eq!(a.contact_id, b.contact_id);
        }
        assert_eq!(repos.contacts.list().await.expect("contacts").len(), 3);
        assert_eq!(repos.deals.list().await.expect("deals").len(), 3);
    }

    #[tokio::test]
    async fn verify_reports_missing_then_present() {
        let repos = CrmRepositories::in_memory();
        let before = DemoSeedDataset::verify(&repos).await.expect("verify empty");
        assert!(!before.all_present);

        DemoSeedDataset::load(&repos, today()).await.expect("load");
        let after = DemoSeedDataset::verify(&repos).await.expect("verify seeded");
        assert!(after.all_present, "checks: {:?}", after.checks);
        assert_eq!(after.checks.len(), 6);
    }

    #[test]
    fn pipeline_total_sums_demo_deals() {
        assert_eq!(DemoSeedDataset::pipeline_total(), 30_000.0);
    }
}
