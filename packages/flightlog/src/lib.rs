//! Flight History Extraction & Query Library
//!
//! Turns a mailbox's booking emails into a canonical, queryable flight log.
//! An LLM extracts raw itineraries from email text, a normalization pass
//! validates them into records, reconciliation dedupes and supersedes
//! against the store, and a tool-calling chat agent answers natural-language
//! questions over the result.
//!
//! # Design Philosophy
//!
//! - Extraction output is untrusted: every field is re-validated before
//!   anything reaches the store
//! - Rescanning a mailbox is idempotent; newer versions of a booking
//!   replace older ones
//! - The model never touches storage directly: it sees a fixed catalogue
//!   of schema-bound read tools
//! - Collaborators are traits; backends and stores swap freely in tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use flightlog::{FlightLog, MemoryStore, StaticAirportDirectory};
//! use flightlog::ai::{OpenAIChat, OpenAIExtractor};
//!
//! let log = FlightLog::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(OpenAIExtractor::from_env()?),
//!     Arc::new(OpenAIChat::from_env()?),
//!     Arc::new(StaticAirportDirectory::new()),
//! );
//!
//! let report = log.scan("traveler@example.com", &emails).await?;
//! let answer = log
//!     .ask("traveler@example.com", "Where did I fly in 2023?", &[])
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator seams (RecordStore, FlightExtractor, ChatBackend)
//! - [`types`] - Records, emails, and conversation types
//! - [`pipeline`] - Scan pipeline: extract, normalize, reconcile
//! - [`tools`] - Query tool layer exposed to the model
//! - [`agent`] - Tool-calling chat orchestrator
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore)
//! - [`airports`] - IATA validation and the embedded airport directory
//! - [`testing`] - Mock backends for tests

pub mod agent;
pub mod airports;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod stores;
pub mod testing;
pub mod tools;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{BackendError, FlightLogError, Result};
pub use traits::{ChatBackend, FlightExtractor, RecordStore};
pub use types::{
    chat::{
        ChatMessage, ChatResponse, ChatRole, FocusDirective, ModelTurn, StopReason, ToolCall,
        ToolInvocation,
    },
    email::{EmailMessage, ExtractedItinerary, ExtractedSegment},
    record::{ChangeKey, EmailBody, FlightRecord, IdentityKey, ScanReport},
};

pub use airports::{AirportDirectory, AirportInfo, StaticAirportDirectory};

// Re-export the facade
pub use service::FlightLog;

// Re-export pipeline components
pub use pipeline::{
    normalize_segments, reconcile, scan_emails, with_retry, ReconcileOutcome, RetryPolicy,
    ScanConfig,
};

// Re-export the tool layer and the orchestrator
pub use agent::{ChatAgent, MAX_TOOL_ITERATIONS};
pub use tools::{tool_catalogue, AirlineCount, AirportVisit, QueryTools, ToolRequest};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

#[cfg(feature = "openai")]
pub use ai::{OpenAIChat, OpenAIExtractor};

// Re-export testing utilities
pub use testing::{answer_turn, tool_turn, MockChatBackend, MockExtractor};
