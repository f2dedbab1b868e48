//! Record storage trait.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::types::record::{ChangeKey, FlightRecord, IdentityKey};

/// Persistent store for flight records.
///
/// Implementations enforce identity-key uniqueness at the storage level
/// (null fields exempt, SQL-style) as the safety net behind the
/// reconciliation engine's own checks. All reads are scoped to one user.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record. Fails with `FlightLogError::DuplicateRecord` when
    /// the identity-key uniqueness constraint is violated.
    async fn insert(&self, record: FlightRecord) -> Result<FlightRecord>;

    /// Atomically delete the superseded records and insert the
    /// replacement. Either everything applies or nothing does.
    async fn replace(
        &self,
        user_email: &str,
        superseded: &[Uuid],
        record: FlightRecord,
    ) -> Result<FlightRecord>;

    /// Delete one record. Returns whether it existed.
    async fn delete(&self, user_email: &str, id: Uuid) -> Result<bool>;

    /// Find the record sharing an exact identity key, if any.
    async fn find_identity_match(&self, key: IdentityKey<'_>) -> Result<Option<FlightRecord>>;

    /// Find all records matching the looser change key.
    async fn find_change_matches(&self, key: ChangeKey<'_>) -> Result<Vec<FlightRecord>>;

    /// All records for a user, optionally restricted to a calendar year,
    /// most recent flight date first.
    async fn list_for_user(&self, user_email: &str, year: Option<i32>) -> Result<Vec<FlightRecord>>;

    /// Records with a flight date in `[start, end]` (inclusive), most
    /// recent first.
    async fn find_by_date_range(
        &self,
        user_email: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FlightRecord>>;

    /// Records where the given IATA code (already upper-cased) is either
    /// endpoint, most recent first.
    async fn find_by_airport(&self, user_email: &str, code: &str) -> Result<Vec<FlightRecord>>;

    /// Records whose source message id is in the given set. Scoped to the
    /// user; ids belonging to other users never match.
    async fn find_by_message_ids(
        &self,
        user_email: &str,
        message_ids: &[String],
    ) -> Result<Vec<FlightRecord>>;

    /// Record count for a user, optionally year-filtered.
    async fn count_for_user(&self, user_email: &str, year: Option<i32>) -> Result<u64>;
}
