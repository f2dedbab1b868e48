//! In-memory record store for testing and development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{FlightLogError, Result};
use crate::traits::store::RecordStore;
use crate::types::record::{ChangeKey, FlightRecord, IdentityKey};

/// In-memory store backed by a `RwLock<HashMap>`.
///
/// Mirrors the SQLite store's semantics, including the identity-key
/// uniqueness constraint with SQL-style null exemption. Useful for
/// testing and development; data is lost on drop.
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, FlightRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Clear all stored records.
    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }

    /// Total record count across all users.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    fn sort_most_recent_first(records: &mut [FlightRecord]) {
        records.sort_by(|a, b| {
            b.flight_date
                .cmp(&a.flight_date)
                .then(b.created_at.cmp(&a.created_at))
        });
    }

    /// The uniqueness safety net: a record without a full identity key is
    /// exempt, mirroring a SQL unique index over nullable columns.
    fn violates_uniqueness(records: &HashMap<Uuid, FlightRecord>, record: &FlightRecord) -> bool {
        match record.identity_key() {
            Some(key) => records.values().any(|existing| key.matches(existing)),
            None => false,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: FlightRecord) -> Result<FlightRecord> {
        let mut records = self.records.write().unwrap();
        if Self::violates_uniqueness(&records, &record) {
            return Err(FlightLogError::DuplicateRecord);
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn replace(
        &self,
        user_email: &str,
        superseded: &[Uuid],
        record: FlightRecord,
    ) -> Result<FlightRecord> {
        // Single write-lock section keeps the delete-and-insert atomic.
        let mut records = self.records.write().unwrap();

        let removed: Vec<(Uuid, FlightRecord)> = superseded
            .iter()
            .filter_map(|id| {
                let owned = records.get(id).map_or(false, |r| r.user_email == user_email);
                if owned {
                    records.remove(id).map(|r| (*id, r))
                } else {
                    None
                }
            })
            .collect();

        if Self::violates_uniqueness(&records, &record) {
            // Roll back the deletes before reporting the violation.
            for (id, old) in removed {
                records.insert(id, old);
            }
            return Err(FlightLogError::DuplicateRecord);
        }

        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, user_email: &str, id: Uuid) -> Result<bool> {
        let mut records = self.records.write().unwrap();
        let owned = records.get(&id).map_or(false, |r| r.user_email == user_email);
        if owned {
            records.remove(&id);
        }
        Ok(owned)
    }

    async fn find_identity_match(&self, key: IdentityKey<'_>) -> Result<Option<FlightRecord>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .find(|r| key.matches(r))
            .cloned())
    }

    async fn find_change_matches(&self, key: ChangeKey<'_>) -> Result<Vec<FlightRecord>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| key.matches(r))
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_email: &str, year: Option<i32>) -> Result<Vec<FlightRecord>> {
        let mut matched: Vec<FlightRecord> = self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.user_email == user_email)
            .filter(|r| year.map_or(true, |y| r.in_year(y)))
            .cloned()
            .collect();
        Self::sort_most_recent_first(&mut matched);
        Ok(matched)
    }

    async fn find_by_date_range(
        &self,
        user_email: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FlightRecord>> {
        let mut matched: Vec<FlightRecord> = self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.user_email == user_email)
            .filter(|r| r.flight_date >= start && r.flight_date <= end)
            .cloned()
            .collect();
        Self::sort_most_recent_first(&mut matched);
        Ok(matched)
    }

    async fn find_by_airport(&self, user_email: &str, code: &str) -> Result<Vec<FlightRecord>> {
        let mut matched: Vec<FlightRecord> = self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.user_email == user_email)
            .filter(|r| r.departure_airport == code || r.arrival_airport == code)
            .cloned()
            .collect();
        Self::sort_most_recent_first(&mut matched);
        Ok(matched)
    }

    async fn find_by_message_ids(
        &self,
        user_email: &str,
        message_ids: &[String],
    ) -> Result<Vec<FlightRecord>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.user_email == user_email)
            .filter(|r| message_ids.iter().any(|id| *id == r.source_message_id))
            .cloned()
            .collect())
    }

    async fn count_for_user(&self, user_email: &str, year: Option<i32>) -> Result<u64> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.user_email == user_email)
            .filter(|r| year.map_or(true, |y| r.in_year(y)))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "traveler@example.com";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(confirmation: &str, flight_number: &str, when: NaiveDate) -> FlightRecord {
        FlightRecord::new(USER, when, "SFO", "JFK")
            .with_confirmation(confirmation)
            .with_flight_number(flight_number)
    }

    #[tokio::test]
    async fn test_insert_rejects_identity_duplicate() {
        let store = MemoryStore::new();
        store.insert(record("ABC123", "UA100", date(2024, 3, 15))).await.unwrap();

        let result = store.insert(record("ABC123", "UA100", date(2024, 3, 15))).await;
        assert!(matches!(result, Err(FlightLogError::DuplicateRecord)));
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn test_null_key_records_are_exempt() {
        let store = MemoryStore::new();
        let a = FlightRecord::new(USER, date(2024, 3, 15), "SFO", "JFK");
        let b = FlightRecord::new(USER, date(2024, 3, 15), "SFO", "JFK");

        store.insert(a).await.unwrap();
        store.insert(b).await.unwrap();
        assert_eq!(store.record_count(), 2);
    }

    #[tokio::test]
    async fn test_replace_is_atomic() {
        let store = MemoryStore::new();
        let old_a = store.insert(record("ABC123", "UA100", date(2024, 3, 15))).await.unwrap();
        let old_b = store.insert(record("ABC123", "UA200", date(2024, 3, 16))).await.unwrap();

        let replacement = record("ABC123", "UA100", date(2024, 3, 20));
        store
            .replace(USER, &[old_a.id, old_b.id], replacement.clone())
            .await
            .unwrap();

        assert_eq!(store.record_count(), 1);
        let remaining = store.list_for_user(USER, None).await.unwrap();
        assert_eq!(remaining[0].id, replacement.id);
        assert_eq!(remaining[0].flight_date, date(2024, 3, 20));
    }

    #[tokio::test]
    async fn test_replace_ignores_other_users_ids() {
        let store = MemoryStore::new();
        let mut foreign = record("ZZZ999", "DL400", date(2024, 5, 1));
        foreign.user_email = "other@example.com".to_string();
        let foreign = store.insert(foreign).await.unwrap();

        store
            .replace(USER, &[foreign.id], record("ABC123", "UA100", date(2024, 3, 15)))
            .await
            .unwrap();

        // The foreign record survives; only the insert happened.
        assert_eq!(store.record_count(), 2);
    }

    #[tokio::test]
    async fn test_date_range_inclusive_and_ordered() {
        let store = MemoryStore::new();
        store.insert(record("A1", "UA1", date(2024, 3, 10))).await.unwrap();
        store.insert(record("A2", "UA2", date(2024, 3, 15))).await.unwrap();
        store.insert(record("A3", "UA3", date(2024, 3, 20))).await.unwrap();
        store.insert(record("A4", "UA4", date(2024, 4, 1))).await.unwrap();

        let hits = store
            .find_by_date_range(USER, date(2024, 3, 10), date(2024, 3, 20))
            .await
            .unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].flight_date, date(2024, 3, 20));
        assert_eq!(hits[2].flight_date, date(2024, 3, 10));
    }

    #[tokio::test]
    async fn test_find_by_airport_matches_either_endpoint() {
        let store = MemoryStore::new();
        store.insert(record("A1", "UA1", date(2024, 3, 10))).await.unwrap();

        let mut inbound = record("A2", "UA2", date(2024, 3, 12));
        inbound.departure_airport = "JFK".to_string();
        inbound.arrival_airport = "SFO".to_string();
        store.insert(inbound).await.unwrap();

        let sfo = store.find_by_airport(USER, "SFO").await.unwrap();
        assert_eq!(sfo.len(), 2);

        let lax = store.find_by_airport(USER, "LAX").await.unwrap();
        assert!(lax.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_message_ids_scoped_to_user() {
        let store = MemoryStore::new();
        let mut mine = record("A1", "UA1", date(2024, 3, 10));
        mine.source_message_id = "msg-1".to_string();
        store.insert(mine).await.unwrap();

        let mut theirs = record("B1", "DL1", date(2024, 3, 11));
        theirs.user_email = "other@example.com".to_string();
        theirs.source_message_id = "msg-1".to_string();
        store.insert(theirs).await.unwrap();

        let hits = store
            .find_by_message_ids(USER, &["msg-1".to_string()])
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user_email, USER);
    }

    #[tokio::test]
    async fn test_count_with_year_filter() {
        let store = MemoryStore::new();
        store.insert(record("A1", "UA1", date(2023, 6, 10))).await.unwrap();
        store.insert(record("A2", "UA2", date(2023, 6, 15))).await.unwrap();
        store.insert(record("A3", "UA3", date(2024, 1, 15))).await.unwrap();

        assert_eq!(store.count_for_user(USER, None).await.unwrap(), 3);
        assert_eq!(store.count_for_user(USER, Some(2023)).await.unwrap(), 2);
        assert_eq!(store.count_for_user(USER, Some(2022)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_identity_and_change_lookups() {
        let store = MemoryStore::new();
        let stored = store.insert(record("ABC123", "UA100", date(2024, 3, 15))).await.unwrap();

        let probe = record("ABC123", "UA100", date(2024, 3, 15));
        let hit = store
            .find_identity_match(probe.identity_key().unwrap())
            .await
            .unwrap();
        assert_eq!(hit.unwrap().id, stored.id);

        // Change key matches across a date change.
        let moved = record("ABC123", "UA100", date(2024, 3, 22));
        let matches = store
            .find_change_matches(moved.change_key().unwrap())
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }
}
