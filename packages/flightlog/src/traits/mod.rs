//! Collaborator traits consumed by the pipeline and the orchestrator.

pub mod chat;
pub mod extractor;
pub mod store;

pub use chat::ChatBackend;
pub use extractor::FlightExtractor;
pub use store::RecordStore;
