//! Pseudo-header email parsing, text scanners and the demo inbox.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEmail {
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub to_email: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEmail {
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl SampleEmail {
    /// Renders the sample as pasteable text with pseudo-headers.
    pub fn to_email_text(&self) -> String {
        format!("From: {}\nSubject: {}\n\n{}", self.from, self.subject, self.body)
    }
}

fn from_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^from:\s*(.+?)(?:\s*<(.+?)>)?$").expect("from header regex should compile")
    })
}

fn to_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^to:\s*<?(.+?)>?$").expect("to header regex should compile")
    })
}

fn email_address() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .expect("email address regex should compile")
    })
}

fn phone_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")
            .expect("phone number regex should compile")
    })
}

fn dollar_amount() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\$\s*(\d[\d,]*(?:\.\d+)?)(\s*k\b)?")
            .expect("dollar amount regex should compile")
    })
}

fn thousands_amount() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*k\b").expect("thousands amount regex should compile")
    })
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &line[prefix.len()..])
}

/// Splits pasted email text into sender, recipient, subject, date and body.
///
/// Header lines are only recognised before the first blank line; everything
/// after it is body text. This differs from matching `From:`/`Subject:`
/// prefixes on every line: a quoted `From:` in a forwarded reply never
/// replaces the real sender. When neither a subject nor a sender address is
/// found the whole input is treated as the body.
pub fn parse_email(email_text: &str) -> ParsedEmail {
    let mut parsed = ParsedEmail::default();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut in_body = false;

    for raw_line in email_text.split('\n') {
        let line = raw_line.trim();

        if in_body {
            body_lines.push(line);
            continue;
        }

        if strip_prefix_ignore_case(line, "from:").is_some() {
            if let Some(captures) = from_header().captures(line) {
                parsed.from_name = captures.get(1).map(|m| m.as_str().trim().to_string());
                if let Some(address) = captures.get(2) {
                    parsed.from_email = Some(address.as_str().trim().to_string());
                }
            }
        } else if strip_prefix_ignore_case(line, "to:").is_some() {
            if let Some(captures) = to_header().captures(line) {
                parsed.to_email = captures.get(1).map(|m| m.as_str().trim().to_string());
            }
        } else if let Some(subject) = strip_prefix_ignore_case(line, "subject:") {
            parsed.subject = Some(subject.trim().to_string());
        } else if let Some(date) = strip_prefix_ignore_case(line, "date:") {
            parsed.date = Some(date.trim().to_string());
        } else if line.is_empty() {
            in_body = true;
        }
    }

    let has_subject = parsed.subject.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
    let has_sender = parsed.from_email.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
    parsed.body = if !has_subject && !has_sender {
        Some(email_text.trim().to_string())
    } else {
        Some(body_lines.join("\n").trim().to_string())
    };

    parsed
}

/// Every email address in `text`, in order of appearance.
pub fn extract_email_addresses(text: &str) -> Vec<String> {
    email_address().find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Distinct North-American-style phone numbers, first-seen order.
pub fn extract_phone_numbers(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    phone_number()
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|number| seen.insert(number.clone()))
        .collect()
}

/// Dollar and `k`-suffixed amounts as numbers, each mention counted once.
pub fn extract_currency_amounts(text: &str) -> Vec<f64> {
    let mut found: Vec<(usize, f64)> = Vec::new();
    let mut claimed: Vec<(usize, usize)> = Vec::new();

    for captures in dollar_amount().captures_iter(text) {
        let (Some(whole), Some(digits)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Ok(value) = digits.as_str().replace(',', "").parse::<f64>() else {
            continue;
        };
        let multiplier = if captures.get(2).is_some() { 1_000.0 } else { 1.0 };
        found.push((whole.start(), value * multiplier));
        claimed.push((whole.start(), whole.end()));
    }

    for captures in thousands_amount().captures_iter(text) {
        let (Some(whole), Some(digits)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let overlaps =
            claimed.iter().any(|(start, end)| whole.start() < *end && *start < whole.end());
        if overlaps {
            continue;
        }
        if let Ok(value) = digits.as_str().parse::<f64>() {
            found.push((whole.start(), value * 1_000.0));
        }
    }

    found.sort_by_key(|(position, _)| *position);
    found.into_iter().map(|(_, value)| value).collect()
}

pub fn sample_emails() -> Vec<SampleEmail> {
    vec![
        SampleEmail {
            from: "Sarah Johnson <sarah.johnson@acmecorp.com>".to_string(),
            subject: "Re: Enterprise Plan Inquiry".to_string(),
            body: "Hi there,

Thanks for the quick response! After discussing with our team, we're very interested in moving forward with the enterprise plan at $10,000 annually.

We have about 25 sales reps who would need access, and the advanced reporting features you mentioned are exactly what we need.

Our budget has been approved, but I need to present this to our VP of Sales next Monday. Could you send over a detailed proposal with implementation timeline?

Looking forward to working together!

Best regards,
Sarah Johnson
Director of Sales Operations
Acme Corp
Phone: +1-555-0101"
                .to_string(),
        },
        SampleEmail {
            from: "Michael Chen <mchen@techstart.io>".to_string(),
            subject: "CRM Demo Request".to_string(),
            body: "Hello,

I'm the founder of TechStart Inc, an early-stage startup in the fintech space. We're looking for a CRM solution that can scale with us.

I saw your pricing starts at around $5K which fits our budget. Before we commit, I'd love to see a live demo of the platform, especially:
- Contact management
- Deal pipeline tracking
- Mobile app capabilities

Are you available for a 30-minute demo this Wednesday afternoon?

Thanks,
Michael Chen
Founder & CEO, TechStart Inc
mchen@techstart.io"
                .to_string(),
        },
        SampleEmail {
            from: "Emily Rodriguez <emily.r@globalsol.com>".to_string(),
            subject: "Contract Review - Final Steps".to_string(),
            body: "Hi team,

We're in the final stages of review for the $15,000 annual contract. Our legal team has gone through the terms and we're ready to proceed.

Just need to finalize a few details:
1. Data migration support for our existing 50+ user accounts
2. Custom integration with Salesforce
3. On-site training for our sales team

If we can confirm these items by end of week, we can sign and start implementation next month.

Best,
Emily Rodriguez
VP of Sales, Global Solutions
emily.r@globalsol.com
+1-555-0103"
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::{
        extract_currency_amounts, extract_email_addresses, extract_phone_numbers, parse_email,
        sample_emails,
    };

    #[test]
    fn parses_sender_subject_and_body() {
        let parsed = parse_email("From: John Doe <john@x.com>\nSubject: Hi\n\nBody line");

        assert_eq!(parsed.from_name.as_deref(), Some("John Doe"));
        assert_eq!(parsed.from_email.as_deref(), Some("john@x.com"));
        assert_eq!(parsed.subject.as_deref(), Some("Hi"));
        assert_eq!(parsed.body.as_deref(), Some("Body line"));
    }

    #[test]
    fn parses_recipient_and_date_case_insensitively() {
        let parsed = parse_email(
            "FROM: Jane <jane@acme.io>\nto: <sales@zeroclick.dev>\nDATE: Mon, 19 Oct 2026\n\nHello",
        );

        assert_eq!(parsed.to_email.as_deref(), Some("sales@zeroclick.dev"));
        assert_eq!(parsed.date.as_deref(), Some("Mon, 19 Oct 2026"));
        assert_eq!(parsed.body.as_deref(), Some("Hello"));
    }

    #[test]
    fn sender_without_brackets_is_a_name_only() {
        let parsed = parse_email("From: john@x.com\n\nHello there");

        assert_eq!(parsed.from_name.as_deref(), Some("john@x.com"));
        assert_eq!(parsed.from_email, None);
        assert_eq!(parsed.body.as_deref(), Some("From: john@x.com\n\nHello there"));
    }

    #[test]
    fn unstructured_text_is_entirely_body() {
        let text = "  Spoke with Dana about renewing at $8,000.  ";
        let parsed = parse_email(text);

        assert_eq!(parsed.body.as_deref(), Some(text.trim()));
        assert_eq!(parsed.subject, None);
    }

    #[test]
    fn header_lookalikes_inside_body_stay_in_body() {
        let parsed = parse_email(
            "From: Ann <ann@x.com>\nSubject: Fwd\n\nSee below\nFrom: Bob <bob@y.com>\nSubject: old",
        );

        assert_eq!(parsed.from_email.as_deref(), Some("ann@x.com"));
        assert_eq!(parsed.subject.as_deref(), Some("Fwd"));
        assert_eq!(
            parsed.body.as_deref(),
            Some("See below\nFrom: Bob <bob@y.com>\nSubject: old")
        );
    }

    #[test]
    fn scans_addresses_in_order() {
        let found = extract_email_addresses("cc a.b@acme.com then sales+crm@zero.click.io");
        assert_eq!(found, vec!["a.b@acme.com", "sales+crm@zero.click.io"]);
    }

    #[test]
    fn scans_distinct_phone_numbers() {
        let found = extract_phone_numbers(
            "Call 555-123-4567 or (555) 987-6543, again 555-123-4567, or +1 555 222 3333",
        );
        assert_eq!(found, vec!["555-123-4567", "(555) 987-6543", "+1 555 222 3333"]);
    }

    #[test]
    fn currency_amounts_are_counted_once() {
        assert_eq!(extract_currency_amounts("$10,000"), vec![10_000.0]);
        assert_eq!(extract_currency_amounts("5k"), vec![5_000.0]);
        assert_eq!(
            extract_currency_amounts("Budget $5000, stretch to $2,500.50 more or 7K, maybe $5k"),
            vec![5_000.0, 2_500.5, 7_000.0, 5_000.0]
        );
    }

    #[test]
    fn currency_ignores_plain_numbers() {
        assert!(extract_currency_amounts("25 sales reps over 3 kinds of plans").is_empty());
    }

    #[test]
    fn samples_parse_back_into_their_sender() {
        let samples = sample_emails();
        assert_eq!(samples.len(), 3);

        for sample in &samples {
            let parsed = parse_email(&sample.to_email_text());
            assert!(parsed.from_email.is_some(), "sample should carry a sender address");
            assert_eq!(parsed.subject.as_deref(), Some(sample.subject.as_str()));
            assert_eq!(parsed.body.as_deref(), Some(sample.body.as_str()));
        }
        assert_eq!(extract_currency_amounts(&samples[0].body), vec![10_000.0]);
        assert_eq!(extract_currency_amounts(&samples[1].body), vec![5_000.0]);
    }
}
