//! Email input types and the model's raw extraction output.

use chrono::{DateTime, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One email handed to a scan: metadata plus cleaned plain-text body.
///
/// The sent-at header is kept as raw text; parsing happens during
/// normalization so an unparsable header degrades to "unknown" rather
/// than failing the email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Provider message id
    pub id: String,

    pub subject: Option<String>,

    /// Raw sent-date header text
    pub sent_at: Option<String>,

    /// Cleaned plain-text body
    pub body: String,
}

impl EmailMessage {
    /// Create a new email message.
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: None,
            sent_at: None,
            body: body.into(),
        }
    }

    /// Set the subject line.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the raw sent-date header.
    pub fn with_sent_at(mut self, sent_at: impl Into<String>) -> Self {
        self.sent_at = Some(sent_at.into());
        self
    }

    /// Parsed sent timestamp; None when the header is absent or
    /// unparsable (sorts oldest during supersession).
    pub fn sent_at_utc(&self) -> Option<DateTime<Utc>> {
        self.sent_at.as_deref().and_then(parse_sent_at)
    }
}

/// Parse a raw sent-date header: RFC 2822 first (the usual email form),
/// then RFC 3339, then a bare `%Y-%m-%d %H:%M:%S` assumed UTC.
pub fn parse_sent_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// The model's raw, unvalidated output for one email. Ephemeral: it only
/// exists between the extraction call and normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedItinerary {
    /// False when the email is not a flight booking at all
    pub valid: bool,

    #[serde(default)]
    pub segments: Vec<ExtractedSegment>,
}

impl ExtractedItinerary {
    /// An itinerary that yields no records.
    pub fn invalid() -> Self {
        Self::default()
    }
}

/// One flight segment as the model saw it. Every field is free text;
/// normalization validates and canonicalizes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedSegment {
    pub airline: Option<String>,

    /// e.g. "UA 100" or "ua100"
    pub flight_number: Option<String>,

    /// IATA code as written, any case
    pub departure_airport: Option<String>,

    pub arrival_airport: Option<String>,

    /// ISO date `YYYY-MM-DD`
    pub flight_date: Option<String>,

    /// 24-hour clock `HH:MM`
    pub departure_time: Option<String>,

    pub arrival_time: Option<String>,

    pub confirmation_number: Option<String>,

    pub cabin_class: Option<String>,

    #[serde(default)]
    pub passengers: Vec<String>,

    pub notes: Option<String>,

    /// Provenance the model found quoted inside the email (a forwarded
    /// booking, for example); falls back to the email's own metadata.
    pub source_message_id: Option<String>,

    pub source_subject: Option<String>,

    pub source_sent_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_sent_at_rfc2822() {
        let parsed = parse_sent_at("Tue, 10 Jun 2023 14:30:00 -0700").unwrap();
        assert_eq!(parsed.hour(), 21); // converted to UTC
    }

    #[test]
    fn test_parse_sent_at_rfc3339() {
        let parsed = parse_sent_at("2023-06-10T14:30:00Z").unwrap();
        assert_eq!(parsed.hour(), 14);
    }

    #[test]
    fn test_parse_sent_at_bare_datetime() {
        let parsed = parse_sent_at("2023-06-10 14:30:00").unwrap();
        assert_eq!(parsed.hour(), 14);
    }

    #[test]
    fn test_parse_sent_at_garbage() {
        assert!(parse_sent_at("next Tuesday-ish").is_none());
        assert!(parse_sent_at("").is_none());
        assert!(parse_sent_at("   ").is_none());
    }

    #[test]
    fn test_email_sent_at_utc() {
        let email = EmailMessage::new("msg-1", "body")
            .with_sent_at("2023-06-10T14:30:00Z");
        assert!(email.sent_at_utc().is_some());

        let no_header = EmailMessage::new("msg-2", "body");
        assert!(no_header.sent_at_utc().is_none());
    }

    #[test]
    fn test_itinerary_deserializes_without_segments() {
        let itinerary: ExtractedItinerary =
            serde_json::from_str(r#"{"valid": false}"#).unwrap();
        assert!(!itinerary.valid);
        assert!(itinerary.segments.is_empty());
    }
}
