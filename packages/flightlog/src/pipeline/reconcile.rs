//! Reconciliation of candidate records against the store.
//!
//! Booking emails arrive more than once: confirmations get re-scanned,
//! changes re-state the whole itinerary, cancellations re-book under the
//! same confirmation number. Reconciliation decides, per candidate,
//! whether to insert it, drop it, or let it supersede what it collides
//! with.

use tracing::info;
use uuid::Uuid;

use crate::error::{FlightLogError, Result};
use crate::traits::store::RecordStore;
use crate::types::record::FlightRecord;

/// What reconciliation did with one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No collision; the candidate was inserted.
    Inserted,

    /// An identical record (same identity key, date included) exists.
    SkippedDuplicate,

    /// A version of this booking sent later already exists.
    SkippedStale,

    /// The candidate replaced this many earlier versions.
    Replaced { superseded: usize },
}

impl ReconcileOutcome {
    /// Whether the candidate was written to the store.
    pub fn saved(&self) -> bool {
        matches!(
            self,
            ReconcileOutcome::Inserted | ReconcileOutcome::Replaced { .. }
        )
    }
}

/// Decide what one candidate does to the store and apply it.
///
/// Three checks, in order:
/// 1. An exact identity-key match (date included) means the same email was
///    scanned again; skip without writing.
/// 2. A change-key match (same confirmation number, or same flight number
///    on the same route, any date) means this booking exists in another
///    version.
/// 3. Among versions, the one sent latest wins: a strictly newer candidate
///    atomically replaces everything it matched, an older one is dropped.
///    Matched records with no parseable sent date count as oldest.
///
/// No collision at all is a plain insert.
pub async fn reconcile(
    store: &dyn RecordStore,
    candidate: FlightRecord,
) -> Result<ReconcileOutcome> {
    if let Some(key) = candidate.identity_key() {
        if store.find_identity_match(key).await?.is_some() {
            return Ok(ReconcileOutcome::SkippedDuplicate);
        }
    }

    let matches = match candidate.change_key() {
        Some(key) => store.find_change_matches(key).await?,
        None => Vec::new(),
    };

    if matches.is_empty() {
        return insert_candidate(store, candidate).await;
    }

    let newest_existing = matches.iter().filter_map(|r| r.source_sent_at).max();
    let supersedes = match (candidate.source_sent_at, newest_existing) {
        // None of the matched records carries a usable timestamp; treat
        // them all as oldest and let the candidate through.
        (_, None) => true,
        (Some(candidate_sent), Some(existing_sent)) => candidate_sent > existing_sent,
        (None, Some(_)) => false,
    };

    if !supersedes {
        return Ok(ReconcileOutcome::SkippedStale);
    }

    let superseded: Vec<Uuid> = matches.iter().map(|r| r.id).collect();
    let count = superseded.len();
    info!(
        "Replacing {} superseded record(s) for {} (confirmation {:?}, flight {:?})",
        count, candidate.user_email, candidate.confirmation_number, candidate.flight_number
    );

    let user_email = candidate.user_email.clone();
    match store.replace(&user_email, &superseded, candidate).await {
        Ok(_) => Ok(ReconcileOutcome::Replaced { superseded: count }),
        Err(FlightLogError::DuplicateRecord) => Ok(ReconcileOutcome::SkippedDuplicate),
        Err(e) => Err(e),
    }
}

/// Insert, treating a storage-level uniqueness violation (a race the
/// checks above did not see) as an ordinary duplicate.
async fn insert_candidate(
    store: &dyn RecordStore,
    candidate: FlightRecord,
) -> Result<ReconcileOutcome> {
    match store.insert(candidate).await {
        Ok(_) => Ok(ReconcileOutcome::Inserted),
        Err(FlightLogError::DuplicateRecord) => Ok(ReconcileOutcome::SkippedDuplicate),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    const USER: &str = "traveler@example.com";

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn sent(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, day, 12, 0, 0).unwrap()
    }

    fn booking(confirmation: &str, day: u32) -> FlightRecord {
        FlightRecord::new(USER, date(day), "SFO", "JFK")
            .with_confirmation(confirmation)
            .with_flight_number("UA100")
    }

    #[tokio::test]
    async fn test_fresh_candidate_is_inserted() {
        let store = MemoryStore::new();
        let outcome = reconcile(&store, booking("ABC123", 15)).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Inserted);
        assert!(outcome.saved());
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rescan_of_same_email_writes_nothing() {
        let store = MemoryStore::new();
        reconcile(&store, booking("ABC123", 15)).await.unwrap();

        let outcome = reconcile(&store, booking("ABC123", 15)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::SkippedDuplicate);
        assert!(!outcome.saved());
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_newer_version_replaces_older() {
        let store = MemoryStore::new();
        let original = booking("ABC123", 15).with_source("msg-1", None, Some(sent(10)));
        reconcile(&store, original).await.unwrap();

        // Same confirmation, moved flight, later email.
        let changed = booking("ABC123", 20).with_source("msg-2", None, Some(sent(12)));
        let outcome = reconcile(&store, changed).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Replaced { superseded: 1 });
        let records = store.list_for_user(USER, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flight_date, date(20));
    }

    #[tokio::test]
    async fn test_older_version_is_skipped_stale() {
        let store = MemoryStore::new();
        let current = booking("ABC123", 20).with_source("msg-2", None, Some(sent(12)));
        reconcile(&store, current).await.unwrap();

        // A lagging scan delivers the earlier version afterwards.
        let stale = booking("ABC123", 15).with_source("msg-1", None, Some(sent(10)));
        let outcome = reconcile(&store, stale).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::SkippedStale);
        let records = store.list_for_user(USER, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flight_date, date(20));
    }

    #[tokio::test]
    async fn test_equal_timestamps_do_not_supersede() {
        let store = MemoryStore::new();
        reconcile(&store, booking("ABC123", 15).with_source("msg-1", None, Some(sent(10))))
            .await
            .unwrap();

        let outcome = reconcile(
            &store,
            booking("ABC123", 20).with_source("msg-2", None, Some(sent(10))),
        )
        .await
        .unwrap();
        assert_eq!(outcome, ReconcileOutcome::SkippedStale);
    }

    #[tokio::test]
    async fn test_candidate_without_timestamp_loses() {
        let store = MemoryStore::new();
        reconcile(&store, booking("ABC123", 15).with_source("msg-1", None, Some(sent(10))))
            .await
            .unwrap();

        let outcome = reconcile(&store, booking("ABC123", 20)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::SkippedStale);
    }

    #[tokio::test]
    async fn test_candidate_wins_when_no_match_has_timestamp() {
        let store = MemoryStore::new();
        reconcile(&store, booking("ABC123", 15)).await.unwrap();

        // Neither side has a sent date; the fresh scan still wins.
        let outcome = reconcile(&store, booking("ABC123", 20)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Replaced { superseded: 1 });
    }

    #[tokio::test]
    async fn test_replaces_all_matched_versions() {
        let store = MemoryStore::new();

        // Two legs of one booking, stored from separate scans.
        store
            .insert(booking("ABC123", 15).with_source("m1", None, Some(sent(8))))
            .await
            .unwrap();
        store
            .insert(
                FlightRecord::new(USER, date(16), "SFO", "JFK")
                    .with_confirmation("ABC123")
                    .with_flight_number("UA200")
                    .with_source("m2", None, Some(sent(9))),
            )
            .await
            .unwrap();
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 2);

        let rebooked = booking("ABC123", 22).with_source("m3", None, Some(sent(11)));
        let outcome = reconcile(&store, rebooked).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Replaced { superseded: 2 });
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_flight_number_and_route_match_without_confirmation() {
        let store = MemoryStore::new();
        let original = FlightRecord::new(USER, date(15), "SFO", "JFK")
            .with_flight_number("UA100")
            .with_source("m1", None, Some(sent(10)));
        reconcile(&store, original).await.unwrap();

        let changed = FlightRecord::new(USER, date(18), "SFO", "JFK")
            .with_flight_number("UA100")
            .with_source("m2", None, Some(sent(12)));
        let outcome = reconcile(&store, changed).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Replaced { superseded: 1 });
    }

    #[tokio::test]
    async fn test_records_without_keys_never_collide() {
        let store = MemoryStore::new();
        let first = FlightRecord::new(USER, date(15), "SFO", "JFK");
        let second = FlightRecord::new(USER, date(15), "SFO", "JFK");

        assert_eq!(reconcile(&store, first).await.unwrap(), ReconcileOutcome::Inserted);
        assert_eq!(reconcile(&store, second).await.unwrap(), ReconcileOutcome::Inserted);
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_same_flight_number_different_route_is_unrelated() {
        let store = MemoryStore::new();
        let outbound = FlightRecord::new(USER, date(15), "SFO", "JFK")
            .with_flight_number("UA100")
            .with_source("m1", None, Some(sent(10)));
        reconcile(&store, outbound).await.unwrap();

        let other = FlightRecord::new(USER, date(18), "SFO", "LAX")
            .with_flight_number("UA100")
            .with_source("m2", None, Some(sent(12)));
        let outcome = reconcile(&store, other).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Inserted);
        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 2);
    }
}
