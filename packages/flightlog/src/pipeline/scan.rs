//! Batch scan - extract, normalize, and reconcile a set of emails.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::airports::AirportDirectory;
use crate::error::Result;
use crate::pipeline::normalize::normalize_segments;
use crate::pipeline::reconcile::reconcile;
use crate::pipeline::retry::{with_retry, RetryPolicy};
use crate::traits::extractor::FlightExtractor;
use crate::traits::store::RecordStore;
use crate::types::email::EmailMessage;
use crate::types::record::ScanReport;

/// Configuration for batch scans.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of concurrent extraction calls
    pub concurrency: usize,

    /// Backoff policy applied to each email's extraction
    pub retry: RetryPolicy,
}

impl ScanConfig {
    /// Create a new scan config with default settings.
    pub fn new() -> Self {
        Self {
            concurrency: 3,
            retry: RetryPolicy::default(),
        }
    }

    /// Set concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan a batch of emails for one user: extract → normalize → reconcile.
///
/// Extraction fans out over a bounded number of concurrent model calls,
/// each retried independently on transient failures; the batch continues
/// past emails that still fail. Reconciliation then runs sequentially so
/// every supersession decision sees the writes before it.
pub async fn scan_emails(
    user_email: &str,
    emails: &[EmailMessage],
    config: &ScanConfig,
    store: &dyn RecordStore,
    extractor: &dyn FlightExtractor,
    directory: &dyn AirportDirectory,
) -> Result<ScanReport> {
    let mut report = ScanReport {
        scanned: emails.len(),
        ..Default::default()
    };

    info!("Scanning {} emails for {}", emails.len(), user_email);

    // 1. Extract (bounded fan-out)
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let extractions = emails.iter().map(|email| {
        let semaphore = semaphore.clone();
        async move {
            let _permit = semaphore.acquire().await.unwrap();
            let result = with_retry(&config.retry, || extractor.extract(email)).await;
            (email, result)
        }
    });
    let outcomes = join_all(extractions).await;

    // 2. Normalize and reconcile, in email order
    for (email, extraction) in outcomes {
        let itinerary = match extraction {
            Ok(itinerary) => itinerary,
            Err(e) => {
                warn!("Extraction failed for {}: {}", email.id, e);
                report.failed_emails.push(email.id.clone());
                continue;
            }
        };

        let candidates = normalize_segments(user_email, email, &itinerary, directory).await;
        report.parsed += candidates.len();

        for candidate in candidates {
            let snapshot = candidate.clone();
            let outcome = reconcile(store, candidate).await?;
            debug!(
                "Reconciled {} {} -> {} from {}: {:?}",
                snapshot.flight_date,
                snapshot.departure_airport,
                snapshot.arrival_airport,
                email.id,
                outcome
            );
            if outcome.saved() {
                report.saved += 1;
                report.records.push(snapshot);
            } else {
                report.skipped += 1;
            }
        }
    }

    info!(
        "Scan complete for {}: {} scanned, {} parsed, {} saved, {} skipped, {} failed",
        user_email,
        report.scanned,
        report.parsed,
        report.saved,
        report.skipped,
        report.failed_emails.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::StaticAirportDirectory;
    use crate::stores::MemoryStore;
    use crate::testing::MockExtractor;
    use crate::types::email::ExtractedSegment;
    use std::time::Duration;

    const USER: &str = "traveler@example.com";

    fn segment(confirmation: &str, date: &str) -> ExtractedSegment {
        ExtractedSegment {
            departure_airport: Some("SFO".to_string()),
            arrival_airport: Some("JFK".to_string()),
            flight_date: Some(date.to_string()),
            confirmation_number: Some(confirmation.to_string()),
            flight_number: Some("UA100".to_string()),
            ..Default::default()
        }
    }

    fn fast_config() -> ScanConfig {
        ScanConfig::new().with_retry(RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        })
    }

    #[tokio::test]
    async fn test_scan_mixed_batch() {
        let store = MemoryStore::new();
        let directory = StaticAirportDirectory::new();
        let extractor = MockExtractor::new()
            .with_segment("msg-1", segment("AAA111", "2024-03-15"))
            .with_segment("msg-2", segment("BBB222", "2024-04-01"));

        let emails = vec![
            EmailMessage::new("msg-1", "booking one"),
            EmailMessage::new("msg-2", "booking two"),
            EmailMessage::new("msg-3", "weekly newsletter"),
        ];

        let report = scan_emails(USER, &emails, &fast_config(), &store, &extractor, &directory)
            .await
            .unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.parsed, 2);
        assert_eq!(report.saved, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.is_success());
        assert_eq!(report.records.len(), 2);
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rescan_writes_nothing() {
        let store = MemoryStore::new();
        let directory = StaticAirportDirectory::new();
        let extractor = MockExtractor::new()
            .with_segment("msg-1", segment("AAA111", "2024-03-15"))
            .with_segment("msg-2", segment("BBB222", "2024-04-01"));

        let emails = vec![
            EmailMessage::new("msg-1", "booking one"),
            EmailMessage::new("msg-2", "booking two"),
        ];

        scan_emails(USER, &emails, &fast_config(), &store, &extractor, &directory)
            .await
            .unwrap();
        let rescan = scan_emails(USER, &emails, &fast_config(), &store, &extractor, &directory)
            .await
            .unwrap();

        assert_eq!(rescan.saved, 0);
        assert_eq!(rescan.skipped, 2);
        assert!(rescan.records.is_empty());
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = MemoryStore::new();
        let directory = StaticAirportDirectory::new();
        let extractor = MockExtractor::new()
            .with_segment("msg-1", segment("AAA111", "2024-03-15"))
            .fail_transiently("msg-1", 2);

        let emails = vec![EmailMessage::new("msg-1", "booking")];
        let report = scan_emails(USER, &emails, &fast_config(), &store, &extractor, &directory)
            .await
            .unwrap();

        assert_eq!(extractor.call_count("msg-1"), 3);
        assert_eq!(report.saved, 1);
        assert!(report.failed_emails.is_empty());
    }

    #[tokio::test]
    async fn test_batch_survives_failed_email() {
        let store = MemoryStore::new();
        let directory = StaticAirportDirectory::new();
        let extractor = MockExtractor::new()
            .fail_message("msg-1")
            .with_segment("msg-2", segment("BBB222", "2024-04-01"));

        let emails = vec![
            EmailMessage::new("msg-1", "booking one"),
            EmailMessage::new("msg-2", "booking two"),
        ];

        let report = scan_emails(USER, &emails, &fast_config(), &store, &extractor, &directory)
            .await
            .unwrap();

        // Permanent failures are not retried.
        assert_eq!(extractor.call_count("msg-1"), 1);
        assert_eq!(report.failed_emails, vec!["msg-1"]);
        assert!(!report.is_success());
        assert_eq!(report.saved, 1);
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_supersession_within_one_batch() {
        let store = MemoryStore::new();
        let directory = StaticAirportDirectory::new();
        let extractor = MockExtractor::new()
            .with_segment("msg-1", segment("AAA111", "2024-03-15"))
            .with_segment("msg-2", segment("AAA111", "2024-03-20"));

        // The change email arrives in the same batch as the original.
        let emails = vec![
            EmailMessage::new("msg-1", "original booking")
                .with_sent_at("2023-06-10T08:00:00Z"),
            EmailMessage::new("msg-2", "your flight was changed")
                .with_sent_at("2023-06-12T08:00:00Z"),
        ];

        let report = scan_emails(USER, &emails, &fast_config(), &store, &extractor, &directory)
            .await
            .unwrap();

        assert_eq!(report.saved, 2);
        let records = store.list_for_user(USER, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].flight_date,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
        );
    }
}
