//! Normalization of extracted segments into canonical records.

use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

use crate::airports::{AirportDirectory, AirportInfo};
use crate::types::email::{parse_sent_at, EmailMessage, ExtractedItinerary, ExtractedSegment};
use crate::types::record::FlightRecord;

/// Turn one email's extraction result into canonical candidate records.
///
/// Segments that fail validation (unknown or malformed airport codes,
/// missing or unparsable flight date) are dropped individually; the rest
/// of the itinerary still goes through. An invalid itinerary yields
/// nothing.
pub async fn normalize_segments(
    user_email: &str,
    email: &EmailMessage,
    itinerary: &ExtractedItinerary,
    directory: &dyn AirportDirectory,
) -> Vec<FlightRecord> {
    if !itinerary.valid {
        return Vec::new();
    }

    let mut records = Vec::with_capacity(itinerary.segments.len());
    for segment in &itinerary.segments {
        if let Some(record) = normalize_segment(user_email, email, segment, directory).await {
            records.push(record);
        }
    }
    records
}

async fn normalize_segment(
    user_email: &str,
    email: &EmailMessage,
    segment: &ExtractedSegment,
    directory: &dyn AirportDirectory,
) -> Option<FlightRecord> {
    let departure = resolve_airport(segment.departure_airport.as_deref(), directory).await;
    let arrival = resolve_airport(segment.arrival_airport.as_deref(), directory).await;

    let ((departure_code, departure_info), (arrival_code, arrival_info)) =
        match (departure, arrival) {
            (Some(dep), Some(arr)) => (dep, arr),
            _ => {
                warn!(
                    "Dropping segment from {}: unrecognized airport ({:?} -> {:?})",
                    email.id, segment.departure_airport, segment.arrival_airport
                );
                return None;
            }
        };

    let flight_date = match segment
        .flight_date
        .as_deref()
        .map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d"))
    {
        Some(Ok(date)) => date,
        _ => {
            warn!(
                "Dropping segment from {}: missing or invalid flight date {:?}",
                email.id, segment.flight_date
            );
            return None;
        }
    };

    let mut record = FlightRecord::new(user_email, flight_date, departure_code, arrival_code)
        .with_cities(departure_info.city, arrival_info.city);
    record.departure_lat = departure_info.latitude;
    record.departure_lng = departure_info.longitude;
    record.arrival_lat = arrival_info.latitude;
    record.arrival_lng = arrival_info.longitude;

    record.confirmation_number =
        clean(segment.confirmation_number.as_deref()).map(|c| c.to_uppercase());
    record.flight_number = clean(segment.flight_number.as_deref())
        .map(|f| f.split_whitespace().collect::<String>().to_uppercase());
    record.airline = clean(segment.airline.as_deref());
    record.cabin_class = clean(segment.cabin_class.as_deref());
    record.notes = clean(segment.notes.as_deref());
    record.passengers = segment
        .passengers
        .iter()
        .filter_map(|p| clean(Some(p.as_str())))
        .collect();

    record.departure_time = parse_clock(segment.departure_time.as_deref());
    record.arrival_time = parse_clock(segment.arrival_time.as_deref());

    // Provenance: prefer what the model found quoted inside the body (a
    // forwarded booking), falling back per field to the email itself.
    record.source_message_id =
        clean(segment.source_message_id.as_deref()).unwrap_or_else(|| email.id.clone());
    record.source_subject = clean(segment.source_subject.as_deref()).or_else(|| email.subject.clone());
    record.source_sent_at = segment
        .source_sent_at
        .as_deref()
        .and_then(parse_sent_at)
        .or_else(|| email.sent_at_utc());
    record.source_body = Some(email.body.clone());

    Some(record)
}

/// Uppercase and validate an airport code (exactly 3 ASCII letters), then
/// resolve it. None on any failure.
async fn resolve_airport(
    raw: Option<&str>,
    directory: &dyn AirportDirectory,
) -> Option<(String, AirportInfo)> {
    let code = raw?.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let info = directory.lookup(&code).await?;
    Some((code, info))
}

/// Parse a 24-hour clock time, tolerating seconds. Failures leave the
/// field unset rather than dropping the segment.
fn parse_clock(raw: Option<&str>) -> Option<NaiveTime> {
    let raw = raw?.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

fn clean(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
