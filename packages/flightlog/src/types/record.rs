//! Flight record types - the canonical unit of persisted travel history.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A canonical flight record.
///
/// Records are created by the reconciliation pipeline during a scan. They
/// are never updated in place: a newer version of the same booking replaces
/// the old record wholesale (delete + insert), and provenance fields are
/// immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Synthetic storage key
    pub id: Uuid,

    /// Owning user
    pub user_email: String,

    /// Booking confirmation number, upper-cased
    pub confirmation_number: Option<String>,

    /// Departure date, local to the departure airport
    pub flight_date: NaiveDate,

    /// Local departure clock time
    pub departure_time: Option<NaiveTime>,

    /// Local arrival clock time
    pub arrival_time: Option<NaiveTime>,

    /// IATA code, exactly 3 uppercase letters
    pub departure_airport: String,

    /// IATA code, exactly 3 uppercase letters
    pub arrival_airport: String,

    /// City name resolved from the airport directory
    pub departure_city: String,

    /// City name resolved from the airport directory
    pub arrival_city: String,

    pub departure_lat: f64,
    pub departure_lng: f64,
    pub arrival_lat: f64,
    pub arrival_lng: f64,

    pub airline: Option<String>,

    /// Flight number with internal whitespace stripped, upper-cased
    pub flight_number: Option<String>,

    pub cabin_class: Option<String>,

    #[serde(default)]
    pub passengers: Vec<String>,

    pub notes: Option<String>,

    /// Source email id (provenance, never part of record identity)
    pub source_message_id: String,

    pub source_subject: Option<String>,

    /// Sent timestamp of the source email; None when the header was
    /// unparsable (treated as oldest during supersession)
    pub source_sent_at: Option<DateTime<Utc>>,

    /// Raw email body. Redacted from every outward serialization; only
    /// the `email_bodies` query returns it, via `EmailBody`.
    #[serde(skip_serializing, default)]
    pub source_body: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl FlightRecord {
    /// Create a new record with the required fields; everything else
    /// starts empty and is filled with the `with_*` builders.
    pub fn new(
        user_email: impl Into<String>,
        flight_date: NaiveDate,
        departure_airport: impl Into<String>,
        arrival_airport: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_email: user_email.into(),
            confirmation_number: None,
            flight_date,
            departure_time: None,
            arrival_time: None,
            departure_airport: departure_airport.into(),
            arrival_airport: arrival_airport.into(),
            departure_city: String::new(),
            arrival_city: String::new(),
            departure_lat: 0.0,
            departure_lng: 0.0,
            arrival_lat: 0.0,
            arrival_lng: 0.0,
            airline: None,
            flight_number: None,
            cabin_class: None,
            passengers: Vec::new(),
            notes: None,
            source_message_id: String::new(),
            source_subject: None,
            source_sent_at: None,
            source_body: None,
            created_at: Utc::now(),
        }
    }

    /// Set the confirmation number.
    pub fn with_confirmation(mut self, confirmation: impl Into<String>) -> Self {
        self.confirmation_number = Some(confirmation.into());
        self
    }

    /// Set the flight number.
    pub fn with_flight_number(mut self, flight_number: impl Into<String>) -> Self {
        self.flight_number = Some(flight_number.into());
        self
    }

    /// Set the airline name.
    pub fn with_airline(mut self, airline: impl Into<String>) -> Self {
        self.airline = Some(airline.into());
        self
    }

    /// Set resolved city names for both endpoints.
    pub fn with_cities(mut self, departure: impl Into<String>, arrival: impl Into<String>) -> Self {
        self.departure_city = departure.into();
        self.arrival_city = arrival.into();
        self
    }

    /// Set provenance from the source email.
    pub fn with_source(
        mut self,
        message_id: impl Into<String>,
        subject: Option<String>,
        sent_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.source_message_id = message_id.into();
        self.source_subject = subject;
        self.source_sent_at = sent_at;
        self
    }

    /// Set the raw source email body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.source_body = Some(body.into());
        self
    }

    /// The full identity key, present only when every field of it is
    /// non-null. Records without one are exempt from exact-duplicate
    /// detection and from the storage uniqueness constraint.
    pub fn identity_key(&self) -> Option<IdentityKey<'_>> {
        Some(IdentityKey {
            user_email: &self.user_email,
            confirmation_number: self.confirmation_number.as_deref()?,
            flight_date: self.flight_date,
            departure_airport: &self.departure_airport,
            arrival_airport: &self.arrival_airport,
            flight_number: self.flight_number.as_deref()?,
        })
    }

    /// The looser change key identifying "the same booking" across a
    /// date or time change. None when the record has neither a
    /// confirmation number nor a flight number.
    pub fn change_key(&self) -> Option<ChangeKey<'_>> {
        if self.confirmation_number.is_none() && self.flight_number.is_none() {
            return None;
        }
        Some(ChangeKey {
            user_email: &self.user_email,
            confirmation_number: self.confirmation_number.as_deref(),
            flight_number: self.flight_number.as_deref(),
            departure_airport: &self.departure_airport,
            arrival_airport: &self.arrival_airport,
        })
    }

    /// Whether the flight date falls in the given calendar year.
    pub fn in_year(&self, year: i32) -> bool {
        self.flight_date.year() == year
    }
}

/// The tuple of fields whose equality defines an exact duplicate.
///
/// All fields are non-null by construction: records missing a
/// confirmation number or flight number have no identity key at all
/// (SQL-style null semantics, where NULL never equals NULL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityKey<'a> {
    pub user_email: &'a str,
    pub confirmation_number: &'a str,
    pub flight_date: NaiveDate,
    pub departure_airport: &'a str,
    pub arrival_airport: &'a str,
    pub flight_number: &'a str,
}

impl IdentityKey<'_> {
    /// Whether an existing record carries exactly this identity.
    pub fn matches(&self, record: &FlightRecord) -> bool {
        record.user_email == self.user_email
            && record.confirmation_number.as_deref() == Some(self.confirmation_number)
            && record.flight_date == self.flight_date
            && record.departure_airport == self.departure_airport
            && record.arrival_airport == self.arrival_airport
            && record.flight_number.as_deref() == Some(self.flight_number)
    }
}

/// The looser key for change detection: same confirmation number, OR same
/// flight number on the same departure/arrival pair. No date requirement,
/// so a rescheduled flight still matches its older version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeKey<'a> {
    pub user_email: &'a str,
    pub confirmation_number: Option<&'a str>,
    pub flight_number: Option<&'a str>,
    pub departure_airport: &'a str,
    pub arrival_airport: &'a str,
}

impl ChangeKey<'_> {
    /// Whether an existing record is "the same booking" as this key.
    ///
    /// A null field on either side disables its disjunct: null never
    /// equals null.
    pub fn matches(&self, record: &FlightRecord) -> bool {
        if record.user_email != self.user_email {
            return false;
        }

        let confirmation_match = match (self.confirmation_number, record.confirmation_number.as_deref()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };

        let flight_match = match (self.flight_number, record.flight_number.as_deref()) {
            (Some(a), Some(b)) => {
                a == b
                    && record.departure_airport == self.departure_airport
                    && record.arrival_airport == self.arrival_airport
            }
            _ => false,
        };

        confirmation_match || flight_match
    }
}

/// Outcome of one batch scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Emails handed to the scan
    pub scanned: usize,

    /// Candidate records surviving extraction + normalization
    pub parsed: usize,

    /// Records actually written (inserted or replacing)
    pub saved: usize,

    /// Candidates discarded as duplicates or stale versions
    pub skipped: usize,

    /// The records written during this scan
    pub records: Vec<FlightRecord>,

    /// Message ids whose extraction failed after retries
    pub failed_emails: Vec<String>,
}

impl ScanReport {
    /// Check if every email in the batch was processed.
    pub fn is_success(&self) -> bool {
        self.failed_emails.is_empty()
    }
}

/// Raw email content for one record, returned only by the
/// `email_bodies` query.
#[derive(Debug, Clone, Serialize)]
pub struct EmailBody {
    pub message_id: String,
    pub subject: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub body: Option<String>,
}
