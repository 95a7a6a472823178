//! Filter specifications derived from natural-language queries and the pure
//! predicate pipeline that applies them to fetched records.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::contact::Contact;
use crate::domain::deal::DealRecord;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryTable {
    Contacts,
    #[default]
    Deals,
}

impl fmt::Display for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contacts => f.write_str("contacts"),
            Self::Deals => f.write_str("deals"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<QueryTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_value_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_value_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
    /// Echoed back to the caller; not applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Echoed back to the caller; not applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_follow_up: Option<bool>,
}

impl FilterSpec {
    /// Spec used whenever a query cannot be translated: every deal.
    pub fn fallback() -> Self {
        Self { table: Some(QueryTable::Deals), ..Self::default() }
    }

    pub fn table(&self) -> QueryTable {
        self.table.unwrap_or_default()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid date in `{field}`: `{value}` is not an ISO-8601 date")]
    InvalidDate { field: String, value: String },
}

/// Fields the query predicates inspect. Deals answer from their nested
/// contact where the deal itself has no such field.
pub trait Filterable {
    fn company(&self) -> Option<&str>;
    fn deal_value(&self) -> Option<f64>;
    fn follow_up_date(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
}

impl Filterable for Contact {
    fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    fn deal_value(&self) -> Option<f64> {
        None
    }

    fn follow_up_date(&self) -> Option<&str> {
        None
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl Filterable for DealRecord {
    fn company(&self) -> Option<&str> {
        self.contacts.as_ref().and_then(|contact| contact.company.as_deref())
    }

    fn deal_value(&self) -> Option<f64> {
        self.deal.deal_value
    }

    fn follow_up_date(&self) -> Option<&str> {
        self.deal.follow_up_date.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.contacts.as_ref().map(|contact| contact.name.as_str())
    }
}

/// Applies every present predicate of `spec` in order: company, value
/// bounds, follow-up date bounds, then name. Returns the surviving records
/// in their original order.
pub fn apply_filters<T>(records: &[T], spec: &FilterSpec) -> Result<Vec<T>, FilterError>
where
    T: Filterable + Clone,
{
    let mut filtered: Vec<T> = records.to_vec();

    if let Some(company) = present(&spec.company) {
        let wanted = company.to_lowercase();
        filtered.retain(|record| {
            record.company().map(|value| value.to_lowercase() == wanted).unwrap_or(false)
        });
    }

    if let Some(min) = spec.deal_value_min {
        filtered.retain(|record| record.deal_value().unwrap_or(0.0) >= min);
    }
    if let Some(max) = spec.deal_value_max {
        filtered.retain(|record| record.deal_value().unwrap_or(0.0) <= max);
    }

    if let Some(raw) = present(&spec.date_from) {
        let bound = parse_filter_date("date_from", raw)?;
        filtered = retain_by_date(filtered, |date| date >= bound)?;
    }
    if let Some(raw) = present(&spec.date_to) {
        let bound = parse_filter_date("date_to", raw)?;
        filtered = retain_by_date(filtered, |date| date <= bound)?;
    }

    if let Some(fragment) = present(&spec.name_contains) {
        let needle = fragment.to_lowercase();
        filtered.retain(|record| {
            record.name().map(|name| name.to_lowercase().contains(&needle)).unwrap_or(false)
        });
    }

    Ok(filtered)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

fn retain_by_date<T, F>(records: Vec<T>, keep: F) -> Result<Vec<T>, FilterError>
where
    T: Filterable,
    F: Fn(NaiveDateTime) -> bool,
{
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        let Some(raw) = record.follow_up_date().filter(|value| !value.trim().is_empty()) else {
            continue;
        };
        if keep(parse_filter_date("follow_up_date", raw)?) {
            kept.push(record);
        }
    }
    Ok(kept)
}

/// Parses an ISO-8601 date or date-time. Bare dates compare as midnight and
/// offsets are normalized to UTC.
pub fn parse_filter_date(field: &str, raw: &str) -> Result<NaiveDateTime, FilterError> {
    let value = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(datetime);
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.naive_utc());
    }

    Err(FilterError::InvalidDate { field: field.to_string(), value: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{apply_filters, parse_filter_date, FilterError, FilterSpec, QueryTable};
    use crate::domain::contact::{Contact, ContactId};
    use crate::domain::deal::{Deal, DealId, DealRecord, DEFAULT_STAGE};

    fn contact(id: i64, name: &str, company: Option<&str>) -> Contact {
        Contact {
            id: ContactId(id),
            name: name.to_string(),
            company: company.map(str::to_string),
            email: None,
            phone: None,
            created_at: Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).single().unwrap_or_default(),
        }
    }

    fn deal(
        id: i64,
        owner: &Contact,
        deal_value: Option<f64>,
        follow_up_date: Option<&str>,
    ) -> DealRecord {
        DealRecord {
            deal: Deal {
                id: DealId(id),
                contact_id: owner.id,
                deal_value,
                stage: DEFAULT_STAGE.to_string(),
                next_step: None,
                follow_up_date: follow_up_date.map(str::to_string),
                notes: None,
                created_at: owner.created_at,
            },
            contacts: Some(owner.clone()),
        }
    }

    fn pipeline() -> Vec<DealRecord> {
        let sarah = contact(1, "Sarah Johnson", Some("Acme Corp"));
        let michael = contact(2, "Michael Chen", Some("TechStart Inc"));
        let emily = contact(3, "Emily Rodriguez", Some("Global Solutions"));
        vec![
            deal(1, &sarah, Some(10_000.0), Some("2026-10-20")),
            deal(2, &michael, Some(5_000.0), Some("2026-10-21")),
            deal(3, &emily, Some(15_000.0), None),
            deal(4, &michael, None, Some("2026-10-19")),
        ]
    }

    fn ids(records: &[DealRecord]) -> Vec<i64> {
        records.iter().map(|record| record.deal.id.0).collect()
    }

    #[test]
    fn table_only_spec_returns_input_unchanged() -> Result<(), FilterError> {
        let records = pipeline();
        let spec = FilterSpec { table: Some(QueryTable::Deals), ..FilterSpec::default() };

        assert_eq!(apply_filters(&records, &spec)?, records);
        Ok(())
    }

    #[test]
    fn value_bounds_treat_missing_value_as_zero() -> Result<(), FilterError> {
        let records = pipeline();
        let spec = FilterSpec {
            deal_value_min: Some(5_000.0),
            deal_value_max: Some(12_000.0),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&apply_filters(&records, &spec)?), vec![1, 2]);

        let ceiling = FilterSpec { deal_value_max: Some(100.0), ..FilterSpec::default() };
        assert_eq!(ids(&apply_filters(&records, &ceiling)?), vec![4]);
        Ok(())
    }

    #[test]
    fn company_match_is_case_insensitive_and_exact() -> Result<(), FilterError> {
        let records = pipeline();

        let lower = FilterSpec { company: Some("acme corp".to_string()), ..FilterSpec::default() };
        assert_eq!(ids(&apply_filters(&records, &lower)?), vec![1]);

        let partial = FilterSpec { company: Some("Acme".to_string()), ..FilterSpec::default() };
        assert!(apply_filters(&records, &partial)?.is_empty());
        Ok(())
    }

    #[test]
    fn name_contains_matches_nested_contact_name() -> Result<(), FilterError> {
        let records = pipeline();
        let spec = FilterSpec { name_contains: Some("sar".to_string()), ..FilterSpec::default() };

        assert_eq!(ids(&apply_filters(&records, &spec)?), vec![1]);
        Ok(())
    }

    #[test]
    fn name_contains_matches_contact_records_directly() -> Result<(), FilterError> {
        let contacts = vec![
            contact(1, "Sarah Johnson", Some("Acme Corp")),
            contact(2, "Michael Chen", None),
        ];
        let spec = FilterSpec {
            table: Some(QueryTable::Contacts),
            name_contains: Some("CHEN".to_string()),
            ..FilterSpec::default()
        };

        let filtered = apply_filters(&contacts, &spec)?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Michael Chen");
        Ok(())
    }

    #[test]
    fn date_window_drops_records_without_follow_up() -> Result<(), FilterError> {
        let records = pipeline();
        let spec = FilterSpec {
            date_from: Some("2026-10-20".to_string()),
            date_to: Some("2026-10-21T00:00:00".to_string()),
            ..FilterSpec::default()
        };

        assert_eq!(ids(&apply_filters(&records, &spec)?), vec![1, 2]);
        Ok(())
    }

    #[test]
    fn blank_values_impose_no_constraint() -> Result<(), FilterError> {
        let records = pipeline();
        let spec = FilterSpec {
            company: Some(String::new()),
            date_from: Some("  ".to_string()),
            name_contains: Some(String::new()),
            stage: Some("closed".to_string()),
            has_follow_up: Some(true),
            ..FilterSpec::default()
        };

        assert_eq!(apply_filters(&records, &spec)?.len(), records.len());
        Ok(())
    }

    #[test]
    fn unparseable_bound_is_an_error() {
        let spec = FilterSpec { date_from: Some("next week".to_string()), ..FilterSpec::default() };

        let result = apply_filters(&pipeline(), &spec);
        assert_eq!(
            result,
            Err(FilterError::InvalidDate {
                field: "date_from".to_string(),
                value: "next week".to_string()
            })
        );
    }

    #[test]
    fn unparseable_record_date_is_an_error() {
        let owner = contact(1, "Sarah Johnson", None);
        let records = vec![deal(1, &owner, None, Some("soon"))];
        let spec = FilterSpec { date_to: Some("2026-12-31".to_string()), ..FilterSpec::default() };

        assert!(matches!(
            apply_filters(&records, &spec),
            Err(FilterError::InvalidDate { ref field, .. }) if field == "follow_up_date"
        ));
    }

    #[test]
    fn rfc3339_dates_are_normalized_to_utc() -> Result<(), FilterError> {
        let parsed = parse_filter_date("date_from", "2026-10-20T02:00:00+02:00")?;
        assert_eq!(parsed, parse_filter_date("date_from", "2026-10-20T00:00:00")?);
        Ok(())
    }

    #[test]
    fn fallback_serializes_to_deals_table_only() {
        let json = serde_json::to_string(&FilterSpec::fallback()).unwrap_or_default();
        assert_eq!(json, r#"{"table":"deals"}"#);
    }
}
