use serde::{Deserialize, Deserializer, Serialize};

use super::non_empty;

/// Structured record the language model extracts from free text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmExtraction {
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub deal_value: Option<f64>,
    #[serde(default)]
    pub next_step: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CrmExtraction {
    /// Record used when extraction fails: every field empty except `notes`,
    /// which carries the analyzed text.
    pub fn fallback(text: &str) -> Self {
        Self { notes: Some(text.to_string()), ..Self::default() }
    }

    pub fn normalized(self) -> Self {
        Self {
            contact_name: non_empty(self.contact_name),
            company: non_empty(self.company),
            email: non_empty(self.email),
            phone: non_empty(self.phone),
            deal_value: self.deal_value,
            next_step: non_empty(self.next_step),
            follow_up_date: non_empty(self.follow_up_date),
            notes: non_empty(self.notes),
        }
    }

    /// A deal is opened only when there is money on the table or a next step.
    pub fn warrants_deal(&self) -> bool {
        let has_value = self.deal_value.map(|value| value != 0.0).unwrap_or(false);
        let has_next_step =
            self.next_step.as_deref().map(|step| !step.trim().is_empty()).unwrap_or(false);
        has_value || has_next_step
    }

    /// Fills sender details from parsed email headers when extraction left
    /// them empty.
    pub fn fill_sender(&mut self, from_name: Option<&str>, from_email: Option<&str>) {
        if self.email.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            if let Some(address) = from_email.filter(|value| !value.trim().is_empty()) {
                self.email = Some(address.to_string());
            }
        }
        if self.contact_name.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            if let Some(name) = from_name.filter(|value| !value.trim().is_empty()) {
                self.contact_name = Some(name.to_string());
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Number(f64),
    Text(String),
}

// Models occasionally answer `"$10,000"` or `"5k"` despite being asked for a
// bare number. Text that still does not parse is treated as absent.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<AmountRepr>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(AmountRepr::Number(value)) => Some(value),
        Some(AmountRepr::Text(text)) => parse_amount_text(&text),
    })
}

pub fn parse_amount_text(text: &str) -> Option<f64> {
    let cleaned: String =
        text.chars().filter(|ch| !matches!(ch, '$' | ',') && !ch.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }

    let (digits, multiplier) = match cleaned.strip_suffix(&['k', 'K'][..]) {
        Some(digits) => (digits, 1_000.0),
        None => (cleaned.as_str(), 1.0),
    };
    digits.parse::<f64>().ok().filter(|value| value.is_finite()).map(|value| value * multiplier)
}

#[cfg(test)]
mod tests {
    use super::{parse_amount_text, CrmExtraction};

    #[test]
    fn deserializes_numeric_and_textual_deal_values() {
        let numeric: CrmExtraction =
            serde_json::from_str(r#"{"contact_name":"Sarah Johnson","deal_value":10000}"#)
                .unwrap_or_default();
        assert_eq!(numeric.deal_value, Some(10_000.0));

        let textual: CrmExtraction =
            serde_json::from_str(r#"{"deal_value":"$15,000"}"#).unwrap_or_default();
        assert_eq!(textual.deal_value, Some(15_000.0));

        let unknown: CrmExtraction =
            serde_json::from_str(r#"{"deal_value":"TBD","notes":"pending"}"#).unwrap_or_default();
        assert_eq!(unknown.deal_value, None);
        assert_eq!(unknown.notes.as_deref(), Some("pending"));
    }

    #[test]
    fn missing_and_null_fields_are_absent() {
        let parsed: CrmExtraction =
            serde_json::from_str(r#"{"contact_name":null,"deal_value":null}"#)
                .unwrap_or_else(|_| CrmExtraction::fallback("broken"));
        assert_eq!(parsed, CrmExtraction::default());
    }

    #[test]
    fn fallback_keeps_text_in_notes() {
        let fallback = CrmExtraction::fallback("call notes");
        assert_eq!(fallback.notes.as_deref(), Some("call notes"));
        assert!(fallback.contact_name.is_none());
        assert!(!fallback.warrants_deal());
    }

    #[test]
    fn deal_requires_value_or_next_step() {
        let mut extraction = CrmExtraction { deal_value: Some(0.0), ..CrmExtraction::default() };
        assert!(!extraction.warrants_deal());

        extraction.next_step = Some("Schedule demo".to_string());
        assert!(extraction.warrants_deal());

        let valued = CrmExtraction { deal_value: Some(5_000.0), ..CrmExtraction::default() };
        assert!(valued.warrants_deal());
    }

    #[test]
    fn fill_sender_only_replaces_empty_fields() {
        let mut extraction = CrmExtraction {
            contact_name: Some("Sarah Johnson".to_string()),
            email: Some(String::new()),
            ..CrmExtraction::default()
        };
        extraction.fill_sender(Some("S. Johnson"), Some("sarah.johnson@acmecorp.com"));

        assert_eq!(extraction.contact_name.as_deref(), Some("Sarah Johnson"));
        assert_eq!(extraction.email.as_deref(), Some("sarah.johnson@acmecorp.com"));
    }

    #[test]
    fn amount_text_handles_thousands_suffix() {
        assert_eq!(parse_amount_text("5k"), Some(5_000.0));
        assert_eq!(parse_amount_text("$2,500.50"), Some(2_500.5));
        assert_eq!(parse_amount_text("  "), None);
    }
}
