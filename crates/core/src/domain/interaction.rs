use serde::{Deserialize, Serialize};

use super::activity::{ActivityId, ActivityType, NewActivity};
use super::contact::{ContactId, NewContact};
use super::deal::{DealId, NewDeal};
use super::extraction::CrmExtraction;

/// One ingested piece of input ready to be written to the store: the
/// activity itself plus whatever contact and deal the extraction implies.
#[derive(Clone, Debug, PartialEq)]
pub struct Interaction {
    pub activity_type: ActivityType,
    pub transcript: String,
    pub summary: String,
    pub extraction: CrmExtraction,
}

impl Interaction {
    pub fn contact(&self) -> Option<NewContact> {
        let name = self.extraction.contact_name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        Some(
            NewContact {
                name: name.to_string(),
                company: self.extraction.company.clone(),
                email: self.extraction.email.clone(),
                phone: self.extraction.phone.clone(),
            }
            .normalized(),
        )
    }

    pub fn activity(&self, contact_id: Option<ContactId>) -> NewActivity {
        NewActivity {
            activity_type: self.activity_type,
            transcript: Some(self.transcript.clone()),
            summary: Some(self.summary.clone()),
            contact_id,
        }
    }

    pub fn deal(&self, contact_id: ContactId) -> Option<NewDeal> {
        if !self.extraction.warrants_deal() {
            return None;
        }
        let extraction = self.extraction.clone().normalized();
        Some(NewDeal {
            deal_value: extraction.deal_value,
            next_step: extraction.next_step,
            follow_up_date: extraction.follow_up_date,
            notes: extraction.notes,
            ..NewDeal::new(contact_id)
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    pub contact_id: Option<ContactId>,
    pub activity_id: Option<ActivityId>,
    pub deal_id: Option<DealId>,
}
