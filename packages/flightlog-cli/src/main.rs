//! Flight log CLI.
//!
//! Scans email fixtures into a local SQLite flight log and answers
//! questions over it. Fixtures are JSON files holding one email object
//! (`{"id", "subject", "sent_at", "body"}`) or an array of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flightlog::ai::{OpenAIChat, OpenAIExtractor};
use flightlog::{EmailMessage, FlightLog, SqliteStore, StaticAirportDirectory};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flightlog", version, about = "Extract and query flight history from emails")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan email fixtures into the flight log
    Scan {
        /// Email address the mailbox belongs to
        #[arg(long)]
        user: String,

        /// A .json email file, or a directory of them
        path: PathBuf,
    },

    /// Ask a question about your flight history
    Ask {
        /// Email address the records belong to
        #[arg(long)]
        user: String,

        /// e.g. "Where did I fly in 2023?"
        question: String,
    },

    /// List stored flights, newest first
    Flights {
        /// Email address the records belong to
        #[arg(long)]
        user: String,

        /// Restrict to one year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Totals, airlines, and airports visited
    Stats {
        /// Email address the records belong to
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flightlog=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:flightlog.db".to_string());
    let store = SqliteStore::new(&database_url)
        .await
        .with_context(|| format!("Failed to open flight log database at {}", database_url))?;

    let log = FlightLog::new(
        Arc::new(store),
        Arc::new(OpenAIExtractor::from_env().context("Failed to configure extraction backend")?),
        Arc::new(OpenAIChat::from_env().context("Failed to configure chat backend")?),
        Arc::new(StaticAirportDirectory::new()),
    );

    match cli.command {
        Command::Scan { user, path } => scan(&log, &user, &path).await,
        Command::Ask { user, question } => ask(&log, &user, &question).await,
        Command::Flights { user, year } => flights(&log, &user, year).await,
        Command::Stats { user } => stats(&log, &user).await,
    }
}

async fn scan(log: &FlightLog, user: &str, path: &Path) -> Result<()> {
    let emails = read_emails(path)?;
    anyhow::ensure!(!emails.is_empty(), "No emails found at {}", path.display());

    println!("Scanning {} email(s) for {}...", emails.len(), user);
    let report = log.scan(user, &emails).await?;

    println!();
    println!("Scanned: {}", report.scanned);
    println!("Parsed:  {}", report.parsed);
    println!("Saved:   {}", report.saved);
    println!("Skipped: {} (already known or stale)", report.skipped);
    if !report.failed_emails.is_empty() {
        println!("Failed:  {}", report.failed_emails.join(", "));
    }

    for record in &report.records {
        println!(
            "  + {}  {} -> {}  {}",
            record.flight_date,
            record.departure_airport,
            record.arrival_airport,
            record.flight_number.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

async fn ask(log: &FlightLog, user: &str, question: &str) -> Result<()> {
    let response = log.ask(user, question, &[]).await?;

    println!("{}", response.answer);
    tracing::debug!(
        "Answered with {} tool call(s) over {} model iteration(s)",
        response.tool_calls.len(),
        response.iterations
    );

    Ok(())
}

async fn flights(log: &FlightLog, user: &str, year: Option<i32>) -> Result<()> {
    let flights = log.list_flights(user, year).await?;
    if flights.is_empty() {
        println!("No flights on record.");
        return Ok(());
    }

    for flight in &flights {
        println!(
            "{}  {} -> {}  {:<8} {}",
            flight.flight_date,
            flight.departure_airport,
            flight.arrival_airport,
            flight.flight_number.as_deref().unwrap_or("-"),
            flight.airline.as_deref().unwrap_or(""),
        );
    }
    println!();
    println!("{} flight(s)", flights.len());

    Ok(())
}

async fn stats(log: &FlightLog, user: &str) -> Result<()> {
    let total = log.total_flights(user, None).await?;
    println!("Total flights: {}", total);

    let airlines = log.airline_stats(user).await?;
    if !airlines.is_empty() {
        println!();
        println!("Airlines:");
        for airline in &airlines {
            println!("  {:<24} {}", airline.airline, airline.flights);
        }
    }

    let visits = log.airport_visits(user, None).await?;
    if !visits.is_empty() {
        println!();
        println!("Airports visited:");
        for visit in &visits {
            println!("  {}  {}", visit.airport, visit.city);
        }
    }

    Ok(())
}

/// Read email fixtures from a single `.json` file or every `.json` file in
/// a directory (sorted by filename for a stable scan order).
fn read_emails(path: &Path) -> Result<Vec<EmailMessage>> {
    if !path.is_dir() {
        return read_email_file(path);
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .with_context(|| format!("Failed to read directory {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    files.sort();

    let mut emails = Vec::new();
    for file in &files {
        emails.extend(read_email_file(file)?);
    }
    Ok(emails)
}

fn read_email_file(path: &Path) -> Result<Vec<EmailMessage>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if text.trim_start().starts_with('[') {
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid email array in {}", path.display()))
    } else {
        let email: EmailMessage = serde_json::from_str(&text)
            .with_context(|| format!("Invalid email object in {}", path.display()))?;
        Ok(vec![email])
    }
}
