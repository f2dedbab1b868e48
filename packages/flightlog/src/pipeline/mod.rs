//! Email ingestion pipeline.
//!
//! `scan` fans extraction out over a batch of emails, `normalize` turns
//! raw model output into canonical records, and `reconcile` decides what
//! each candidate does to the store.

pub mod normalize;
pub mod reconcile;
pub mod retry;
pub mod scan;

pub use normalize::normalize_segments;
pub use reconcile::{reconcile, ReconcileOutcome};
pub use retry::{with_retry, RetryPolicy};
pub use scan::{scan_emails, ScanConfig};
