use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contact::{Contact, ContactId};

pub const DEFAULT_STAGE: &str = "initial";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(pub i64);

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub contact_id: ContactId,
    pub deal_value: Option<f64>,
    pub stage: String,
    pub next_step: Option<String>,
    pub follow_up_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewDeal {
    pub contact_id: ContactId,
    pub deal_value: Option<f64>,
    pub stage: String,
    pub next_step: Option<String>,
    pub follow_up_date: Option<String>,
    pub notes: Option<String>,
}

impl NewDeal {
    pub fn new(contact_id: ContactId) -> Self {
        Self {
            contact_id,
            deal_value: None,
            stage: DEFAULT_STAGE.to_string(),
            next_step: None,
            follow_up_date: None,
            notes: None,
        }
    }
}

/// A deal joined with its owning contact, serialized in the
/// `{..deal, "contacts": {..contact}}` shape list endpoints return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DealRecord {
    #[serde(flatten)]
    pub deal: Deal,
    pub contacts: Option<Contact>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Deal, DealId, DealRecord, NewDeal, DEFAULT_STAGE};
    use crate::domain::contact::ContactId;

    #[test]
    fn new_deal_starts_in_initial_stage() {
        let deal = NewDeal::new(ContactId(7));
        assert_eq!(deal.stage, DEFAULT_STAGE);
        assert_eq!(deal.contact_id, ContactId(7));
    }

    #[test]
    fn deal_record_flattens_deal_fields_next_to_contacts() {
        let record = DealRecord {
            deal: Deal {
                id: DealId(3),
                contact_id: ContactId(1),
                deal_value: Some(10_000.0),
                stage: DEFAULT_STAGE.to_string(),
                next_step: Some("Send proposal".to_string()),
                follow_up_date: None,
                notes: None,
                created_at: Utc::now(),
            },
            contacts: None,
        };

        let value = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(value["id"], 3);
        assert_eq!(value["deal_value"], 10_000.0);
        assert!(value["contacts"].is_null());
    }
}
