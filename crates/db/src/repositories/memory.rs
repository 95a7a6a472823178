use chrono::Utc;
use tokio::sync::RwLock;

use zeroclick_core::domain::activity::{Activity, ActivityId, ActivityRecord, NewActivity};
use zeroclick_core::domain::contact::{Contact, ContactId, NewContact};
use zeroclick_core::domain::deal::{Deal, DealId, DealRecord, NewDeal};
use zeroclick_core::domain::interaction::{Interaction, InteractionOutcome};

use super::{
    ActivityRepository, ContactRepository, DealRepository, InteractionRepository, RepositoryError,
};

#[derive(Default)]
struct CrmTables {
    contacts: Vec<Contact>,
    deals: Vec<Deal>,
    activities: Vec<Activity>,
    next_contact_id: i64,
    next_deal_id: i64,
    next_activity_id: i64,
}

impl CrmTables {
    fn find_or_insert_contact(&mut self, contact: &NewContact) -> ContactId {
        if let Some(existing) = self
            .contacts
            .iter()
            .find(|row| row.is_same_person(&contact.name, contact.company.as_deref()))
        {
            return existing.id;
        }

        self.next_contact_id += 1;
        let id = ContactId(self.next_contact_id);
        self.contacts.push(Contact {
            id,
            name: contact.name.clone(),
            company: contact.company.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            created_at: Utc::now(),
        });
        id
    }

    fn contact(&self, id: ContactId) -> Option<Contact> {
        self.contacts.iter().find(|contact| contact.id == id).cloned()
    }

    fn insert_deal(&mut self, deal: &NewDeal) -> Result<Deal, RepositoryError> {
        if self.contact(deal.contact_id).is_none() {
            return Err(RepositoryError::Decode(format!(
                "deal references unknown contact {}",
                deal.contact_id
            )));
        }

        self.next_deal_id += 1;
        let created = Deal {
            id: DealId(self.next_deal_id),
            contact_id: deal.contact_id,
            deal_value: deal.deal_value,
            stage: deal.stage.clone(),
            next_step: deal.next_step.clone(),
            follow_up_date: deal.follow_up_date.clone(),
            notes: deal.notes.clone(),
            created_at: Utc::now(),
        };
        self.deals.push(created.clone());
        Ok(created)
    }

    fn insert_activity(&mut self, activity: &NewActivity) -> Activity {
        self.next_activity_id += 1;
        let created = Activity {
            id: ActivityId(self.next_activity_id),
            activity_type: activity.activity_type,
            transcript: activity.transcript.clone(),
            summary: activity.summary.clone(),
            contact_id: activity.contact_id,
            timestamp: Utc::now(),
        };
        self.activities.push(created.clone());
        created
    }
}

/// Process-local CRM store. All four repositories share one lock, so an
/// interaction is recorded inside a single critical section.
#[derive(Default)]
pub struct InMemoryCrmStore {
    tables: RwLock<CrmTables>,
}

#[async_trait::async_trait]
impl ContactRepository for InMemoryCrmStore {
    async fn find_or_create(&self, contact: NewContact) -> Result<ContactId, RepositoryError> {
        let contact = contact.normalized();
        let mut tables = self.tables.write().await;
        Ok(tables.find_or_insert_contact(&contact))
    }

    async fn find_by_id(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.contact(id))
    }

    async fn list(&self) -> Result<Vec<Contact>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut contacts = tables.contacts.clone();
        contacts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(contacts)
    }
}

#[async_trait::async_trait]
impl DealRepository for InMemoryCrmStore {
    async fn create(&self, deal: NewDeal) -> Result<Deal, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.insert_deal(&deal)
    }

    async fn list(&self) -> Result<Vec<DealRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut deals = tables.deals.clone();
        deals.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(deals
            .into_iter()
            .map(|deal| {
                let contacts = tables.contact(deal.contact_id);
                DealRecord { deal, contacts }
            })
            .collect())
    }

    async fn list_for_contact(&self, contact_id: ContactId) -> Result<Vec<Deal>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut deals: Vec<Deal> =
            tables.deals.iter().filter(|deal| deal.contact_id == contact_id).cloned().collect();
        deals.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(deals)
    }
}

#[async_trait::async_trait]
impl ActivityRepository for InMemoryCrmStore {
    async fn create(&self, activity: NewActivity) -> Result<Activity, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.insert_activity(&activity))
    }

    async fn list(&self) -> Result<Vec<ActivityRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut activities = tables.activities.clone();
        activities.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(activities
            .into_iter()
            .map(|activity| {
                let contacts = activity.contact_id.and_then(|id| tables.contact(id));
                ActivityRecord { activity, contacts }
            })
            .collect())
    }

    async fn list_for_contact(
        &self,
        contact_id: ContactId,
    ) -> Result<Vec<Activity>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut activities: Vec<Activity> = tables
            .activities
            .iter()
            .filter(|activity| activity.contact_id == Some(contact_id))
            .cloned()
            .collect();
        activities.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(activities)
    }
}

#[async_trait::async_trait]
impl InteractionRepository for InMemoryCrmStore {
    async fn record(
        &self,
        interaction: Interaction,
    ) -> Result<InteractionOutcome, RepositoryError> {
        let mut tables = self.tables.write().await;

        let contact_id =
            interaction.contact().map(|contact| tables.find_or_insert_contact(&contact));
        let logged = tables.insert_activity(&interaction.activity(contact_id));
        let deal_id = match contact_id.and_then(|id| interaction.deal(id)) {
            Some(new_deal) => Some(tables.insert_deal(&new_deal)?.id),
            None => None,
        };

        Ok(InteractionOutcome { contact_id, activity_id: Some(logged.id), deal_id })
    }
}
