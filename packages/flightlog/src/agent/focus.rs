//! Focus directive extraction from final answers.
//!
//! The model may end an answer with one `<<FOCUS>>` … `<</FOCUS>>` block
//! carrying a JSON payload for downstream visualizers. The block never
//! reaches the user: it is stripped whether or not the payload parses.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::types::chat::{FocusDirective, ToolInvocation};

const OPEN_MARKER: &str = "<<FOCUS>>";
const CLOSE_MARKER: &str = "<</FOCUS>>";

/// Split an answer into user-visible text and the directive, if one
/// parses. An unterminated open marker strips to end-of-text; malformed
/// payloads are discarded without failing the response.
pub fn extract_focus(answer: &str) -> (String, Option<FocusDirective>) {
    let open = match answer.find(OPEN_MARKER) {
        Some(index) => index,
        None => return (answer.trim().to_string(), None),
    };

    let after_open = &answer[open + OPEN_MARKER.len()..];
    let (payload, rest) = match after_open.find(CLOSE_MARKER) {
        Some(close) => (
            &after_open[..close],
            &after_open[close + CLOSE_MARKER.len()..],
        ),
        None => (after_open, ""),
    };

    let visible = format!("{}{}", &answer[..open], rest).trim().to_string();

    let directive = match serde_json::from_str::<FocusDirective>(payload.trim()) {
        Ok(directive) => Some(directive),
        Err(e) => {
            warn!("Discarding malformed focus directive: {}", e);
            None
        }
    };

    (visible, directive)
}

/// Derive a directive from the executed invocations when the model did
/// not supply one: flight-list results win, then airport visits, then
/// everything.
pub fn derive_focus(invocations: &[ToolInvocation]) -> FocusDirective {
    let mut flight_ids: Vec<Uuid> = Vec::new();
    for invocation in invocations {
        if matches!(
            invocation.name.as_str(),
            "flights_by_date_range" | "flights_by_airport"
        ) {
            collect_flight_ids(&invocation.result, &mut flight_ids);
        }
    }
    if !flight_ids.is_empty() {
        return FocusDirective::Flights { flight_ids };
    }

    let mut airports: Vec<String> = Vec::new();
    for invocation in invocations {
        if invocation.name == "airport_visits" {
            collect_airports(&invocation.result, &mut airports);
        }
    }
    if !airports.is_empty() {
        return FocusDirective::Airports { airports };
    }

    FocusDirective::All
}

fn collect_flight_ids(result: &Value, ids: &mut Vec<Uuid>) {
    let flights = match result.get("flights").and_then(Value::as_array) {
        Some(flights) => flights,
        None => return,
    };

    for flight in flights {
        let id = flight
            .get("id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok());
        if let Some(id) = id {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
}

fn collect_airports(result: &Value, airports: &mut Vec<String>) {
    let visits = match result.get("airports").and_then(Value::as_array) {
        Some(visits) => visits,
        None => return,
    };

    for visit in visits {
        if let Some(code) = visit.get("airport").and_then(Value::as_str) {
            if !airports.iter().any(|known| known == code) {
                airports.push(code.to_string());
            }
        }
    }
}
