//! Tool argument schemas and the validated request union.

use chrono::NaiveDate;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{FlightLogError, Result};

/// Arguments for `flights_by_date_range`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DateRangeArgs {
    /// Start of the range as YYYY-MM-DD, inclusive
    pub start_date: String,

    /// End of the range as YYYY-MM-DD, inclusive
    pub end_date: String,
}

impl DateRangeArgs {
    /// Parse both bounds; the error message names the offending field.
    pub fn range(&self) -> std::result::Result<(NaiveDate, NaiveDate), String> {
        let start = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d")
            .map_err(|e| format!("invalid start_date {:?}: {}", self.start_date, e))?;
        let end = NaiveDate::parse_from_str(&self.end_date, "%Y-%m-%d")
            .map_err(|e| format!("invalid end_date {:?}: {}", self.end_date, e))?;
        Ok((start, end))
    }
}

/// Arguments for tools that optionally restrict to one calendar year.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct YearArgs {
    /// Calendar year to restrict to; omit for all time
    pub year: Option<i32>,
}

/// Arguments for `flights_by_airport`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AirportArgs {
    /// 3-letter IATA airport code, any case
    pub airport: String,
}

/// Arguments for tools that take none.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Arguments for `email_bodies`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MessageIdArgs {
    /// Source message ids to fetch raw email content for
    pub message_ids: Vec<String>,
}

/// A tool invocation request, validated against the per-tool schema.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    FlightsByDateRange(DateRangeArgs),
    AirportVisits(YearArgs),
    TotalFlights(YearArgs),
    FlightsByAirport(AirportArgs),
    AirlineStats(NoArgs),
    EmailBodies(MessageIdArgs),
}

impl ToolRequest {
    /// Parse a named tool call against its argument schema.
    ///
    /// A name outside the catalogue is `FlightLogError::UnknownTool`;
    /// malformed arguments for a known tool are
    /// `FlightLogError::ToolArguments`. The orchestrator treats the first
    /// as fatal and reports the second back to the model.
    pub fn parse(name: &str, raw_arguments: &str) -> Result<Self> {
        match name {
            "flights_by_date_range" => {
                Ok(Self::FlightsByDateRange(parse_args(name, raw_arguments)?))
            }
            "airport_visits" => Ok(Self::AirportVisits(parse_args(name, raw_arguments)?)),
            "total_flights" => Ok(Self::TotalFlights(parse_args(name, raw_arguments)?)),
            "flights_by_airport" => Ok(Self::FlightsByAirport(parse_args(name, raw_arguments)?)),
            "airline_stats" => Ok(Self::AirlineStats(parse_args(name, raw_arguments)?)),
            "email_bodies" => Ok(Self::EmailBodies(parse_args(name, raw_arguments)?)),
            _ => Err(FlightLogError::UnknownTool(name.to_string())),
        }
    }

    /// The wire name of the requested tool.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlightsByDateRange(_) => "flights_by_date_range",
            Self::AirportVisits(_) => "airport_visits",
            Self::TotalFlights(_) => "total_flights",
            Self::FlightsByAirport(_) => "flights_by_airport",
            Self::AirlineStats(_) => "airline_stats",
            Self::EmailBodies(_) => "email_bodies",
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, raw: &str) -> Result<T> {
    // Models sometimes send nothing at all for no-argument tools.
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| FlightLogError::ToolArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// The fixed tool catalogue advertised to the model, in provider wire
/// shape.
pub fn tool_catalogue() -> Vec<Value> {
    vec![
        tool_definition::<DateRangeArgs>(
            "flights_by_date_range",
            "Flights departing within an inclusive date range, most recent first.",
        ),
        tool_definition::<YearArgs>(
            "airport_visits",
            "Distinct airports the user departed from or arrived at, optionally for one year.",
        ),
        tool_definition::<YearArgs>(
            "total_flights",
            "Total number of recorded flights, optionally for one year.",
        ),
        tool_definition::<AirportArgs>(
            "flights_by_airport",
            "Flights that depart from or arrive at a given airport.",
        ),
        tool_definition::<NoArgs>(
            "airline_stats",
            "Flight counts per airline, most flown first.",
        ),
        tool_definition::<MessageIdArgs>(
            "email_bodies",
            "Raw source email content for the given message ids.",
        ),
    ]
}

fn tool_definition<Args: JsonSchema>(name: &str, description: &str) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters_schema::<Args>(),
        }
    })
}

fn parameters_schema<Args: JsonSchema>() -> Value {
    let schema = schema_for!(Args);
    let mut value = serde_json::to_value(schema).unwrap_or_default();
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
    }
    value
}
