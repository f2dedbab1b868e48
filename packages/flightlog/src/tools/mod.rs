//! Query tool layer.
//!
//! A fixed catalogue of read operations over the record store, each
//! scoped to one user. The orchestrator advertises these to the model,
//! but every operation is an ordinary async method, independently
//! callable outside any conversation.

pub mod args;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{FlightLogError, Result};
use crate::traits::store::RecordStore;
use crate::types::record::{EmailBody, FlightRecord};

pub use args::{tool_catalogue, ToolRequest};

/// One distinct airport in a user's travel history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirportVisit {
    pub airport: String,
    pub city: String,
}

/// Flight count for one airline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirlineCount {
    pub airline: String,
    pub flights: u64,
}

/// Read operations over one user's flight records.
#[derive(Clone)]
pub struct QueryTools {
    store: Arc<dyn RecordStore>,
}

impl QueryTools {
    /// Create the tool layer over a record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Flights with a departure date in `[start, end]`, most recent
    /// first.
    pub async fn flights_by_date_range(
        &self,
        user_email: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FlightRecord>> {
        self.store.find_by_date_range(user_email, start, end).await
    }

    /// Distinct airports appearing as either endpoint, with resolved
    /// city names, ordered by code. A record contributes at most two.
    pub async fn airport_visits(
        &self,
        user_email: &str,
        year: Option<i32>,
    ) -> Result<Vec<AirportVisit>> {
        let records = self.store.list_for_user(user_email, year).await?;

        let mut visited: BTreeMap<String, String> = BTreeMap::new();
        for record in &records {
            visited
                .entry(record.departure_airport.clone())
                .or_insert_with(|| record.departure_city.clone());
            visited
                .entry(record.arrival_airport.clone())
                .or_insert_with(|| record.arrival_city.clone());
        }

        Ok(visited
            .into_iter()
            .map(|(airport, city)| AirportVisit { airport, city })
            .collect())
    }

    /// Total recorded flights, optionally for one calendar year.
    pub async fn total_flights(&self, user_email: &str, year: Option<i32>) -> Result<u64> {
        self.store.count_for_user(user_email, year).await
    }

    /// Flights with the given airport as either endpoint. The code is
    /// normalized to uppercase before matching.
    pub async fn flights_by_airport(
        &self,
        user_email: &str,
        airport: &str,
    ) -> Result<Vec<FlightRecord>> {
        let code = airport.trim().to_uppercase();
        self.store.find_by_airport(user_email, &code).await
    }

    /// Flight counts per airline, descending; records without an airline
    /// are excluded.
    pub async fn airline_stats(&self, user_email: &str) -> Result<Vec<AirlineCount>> {
        let records = self.store.list_for_user(user_email, None).await?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in &records {
            if let Some(airline) = &record.airline {
                *counts.entry(airline.clone()).or_insert(0) += 1;
            }
        }

        let mut stats: Vec<AirlineCount> = counts
            .into_iter()
            .map(|(airline, flights)| AirlineCount { airline, flights })
            .collect();
        stats.sort_by(|a, b| b.flights.cmp(&a.flights).then_with(|| a.airline.cmp(&b.airline)));
        Ok(stats)
    }

    /// Raw email content for the given message ids, one entry per
    /// distinct message. Scoped to the requesting user: ids that belong
    /// to someone else's records never match. This is the only operation
    /// that returns raw bodies.
    pub async fn email_bodies(
        &self,
        user_email: &str,
        message_ids: &[String],
    ) -> Result<Vec<EmailBody>> {
        let records = self.store.find_by_message_ids(user_email, message_ids).await?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut bodies = Vec::new();
        for record in records {
            if seen.insert(record.source_message_id.clone()) {
                bodies.push(EmailBody {
                    message_id: record.source_message_id,
                    subject: record.source_subject,
                    sent_at: record.source_sent_at,
                    body: record.source_body,
                });
            }
        }
        Ok(bodies)
    }

    /// Execute a parsed tool request, producing the JSON payload fed
    /// back to the model.
    pub async fn execute(&self, user_email: &str, request: &ToolRequest) -> Result<Value> {
        match request {
            ToolRequest::FlightsByDateRange(args) => {
                let (start, end) =
                    args.range().map_err(|message| FlightLogError::ToolArguments {
                        tool: request.name().to_string(),
                        message,
                    })?;
                let flights = self.flights_by_date_range(user_email, start, end).await?;
                Ok(json!({ "count": flights.len(), "flights": flights }))
            }
            ToolRequest::AirportVisits(args) => {
                let airports = self.airport_visits(user_email, args.year).await?;
                Ok(json!({ "count": airports.len(), "airports": airports }))
            }
            ToolRequest::TotalFlights(args) => {
                let total = self.total_flights(user_email, args.year).await?;
                Ok(json!({ "total_flights": total }))
            }
            ToolRequest::FlightsByAirport(args) => {
                let flights = self.flights_by_airport(user_email, &args.airport).await?;
                Ok(json!({ "count": flights.len(), "flights": flights }))
            }
            ToolRequest::AirlineStats(_) => {
                let airlines = self.airline_stats(user_email).await?;
                Ok(json!({ "airlines": airlines }))
            }
            ToolRequest::EmailBodies(args) => {
                let emails = self.email_bodies(user_email, &args.message_ids).await?;
                Ok(json!({ "count": emails.len(), "emails": emails }))
            }
        }
    }
}
