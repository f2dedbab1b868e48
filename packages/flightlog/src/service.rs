//! The `FlightLog` facade.
//!
//! Owns the wired collaborators (store, extractor, chat backend, airport
//! directory) and exposes the outward interface: batch scanning,
//! conversational queries, and the direct query operations. Callers build
//! one `FlightLog` at startup and share it; there are no globals.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::agent::ChatAgent;
use crate::airports::AirportDirectory;
use crate::error::Result;
use crate::pipeline::{scan_emails, ScanConfig};
use crate::tools::{AirlineCount, AirportVisit, QueryTools};
use crate::traits::chat::ChatBackend;
use crate::traits::extractor::FlightExtractor;
use crate::traits::store::RecordStore;
use crate::types::chat::{ChatMessage, ChatResponse};
use crate::types::email::EmailMessage;
use crate::types::record::{EmailBody, FlightRecord, ScanReport};

/// Entry point for embedding the flight log in a binary or service.
pub struct FlightLog {
    store: Arc<dyn RecordStore>,
    extractor: Arc<dyn FlightExtractor>,
    directory: Arc<dyn AirportDirectory>,
    scan_config: ScanConfig,
    tools: QueryTools,
    agent: ChatAgent,
}

impl FlightLog {
    /// Wire a flight log from its collaborators.
    pub fn new(
        store: Arc<dyn RecordStore>,
        extractor: Arc<dyn FlightExtractor>,
        chat: Arc<dyn ChatBackend>,
        directory: Arc<dyn AirportDirectory>,
    ) -> Self {
        let tools = QueryTools::new(store.clone());
        let agent = ChatAgent::new(chat, tools.clone());
        Self {
            store,
            extractor,
            directory,
            scan_config: ScanConfig::new(),
            tools,
            agent,
        }
    }

    /// Replace the default scan tuning (concurrency, retry policy).
    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    /// Scan a batch of emails for one user: extract, normalize, reconcile.
    pub async fn scan(&self, user_email: &str, emails: &[EmailMessage]) -> Result<ScanReport> {
        scan_emails(
            user_email,
            emails,
            &self.scan_config,
            self.store.as_ref(),
            self.extractor.as_ref(),
            self.directory.as_ref(),
        )
        .await
    }

    /// Answer a natural-language question over the user's flight history.
    pub async fn ask(
        &self,
        user_email: &str,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<ChatResponse> {
        self.agent.ask(user_email, question, history).await
    }

    /// All of a user's flights, optionally restricted to one year, newest
    /// flight date first.
    pub async fn list_flights(
        &self,
        user_email: &str,
        year: Option<i32>,
    ) -> Result<Vec<FlightRecord>> {
        self.store.list_for_user(user_email, year).await
    }

    /// Flights departing or arriving within an inclusive date range.
    pub async fn flights_by_date_range(
        &self,
        user_email: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FlightRecord>> {
        self.tools.flights_by_date_range(user_email, start, end).await
    }

    /// Distinct airports the user has touched, optionally for one year.
    pub async fn airport_visits(
        &self,
        user_email: &str,
        year: Option<i32>,
    ) -> Result<Vec<AirportVisit>> {
        self.tools.airport_visits(user_email, year).await
    }

    /// Total stored flights, optionally for one year.
    pub async fn total_flights(&self, user_email: &str, year: Option<i32>) -> Result<u64> {
        self.tools.total_flights(user_email, year).await
    }

    /// Flights with the given airport as either endpoint.
    pub async fn flights_by_airport(
        &self,
        user_email: &str,
        airport: &str,
    ) -> Result<Vec<FlightRecord>> {
        self.tools.flights_by_airport(user_email, airport).await
    }

    /// Flight counts per airline, most flown first.
    pub async fn airline_stats(&self, user_email: &str) -> Result<Vec<AirlineCount>> {
        self.tools.airline_stats(user_email).await
    }

    /// Source email bodies for the given message ids.
    pub async fn email_bodies(
        &self,
        user_email: &str,
        message_ids: &[String],
    ) -> Result<Vec<EmailBody>> {
        self.tools.email_bodies(user_email, message_ids).await
    }
}
