//! Extraction backend trait.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::email::{EmailMessage, ExtractedItinerary};

/// Language-model extraction of flight segments from one email.
///
/// Implementations wrap a specific model provider. Failures are
/// classified by `BackendError::retryable` so the scan pipeline can
/// retry transient ones with backoff.
#[async_trait]
pub trait FlightExtractor: Send + Sync {
    /// Extract the itinerary described by the email, or
    /// `valid: false` when the email is not a flight booking.
    async fn extract(&self, email: &EmailMessage)
        -> std::result::Result<ExtractedItinerary, BackendError>;
}
