//! SQLite record store.
//!
//! A file-based storage backend. Good for:
//! - Local development
//! - Single-server deployments
//! - Testing with persistent data

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{FlightLogError, Result};
use crate::traits::store::RecordStore;
use crate::types::record::{ChangeKey, FlightRecord, IdentityKey};

const COLUMNS: &str = "id, user_email, confirmation_number, flight_date, departure_time, \
     arrival_time, departure_airport, arrival_airport, departure_city, arrival_city, \
     departure_lat, departure_lng, arrival_lat, arrival_lng, airline, flight_number, \
     cabin_class, passengers, notes, source_message_id, source_subject, source_sent_at, \
     source_body, created_at";

/// SQLite-based record store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite:flightlog.db` - File-based database (created if missing)
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// The pool is pinned to a single connection that never expires;
    /// otherwise every checkout would see a fresh empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flight_records (
                id TEXT PRIMARY KEY,
                user_email TEXT NOT NULL,
                confirmation_number TEXT,
                flight_date TEXT NOT NULL,
                departure_time TEXT,
                arrival_time TEXT,
                departure_airport TEXT NOT NULL,
                arrival_airport TEXT NOT NULL,
                departure_city TEXT NOT NULL,
                arrival_city TEXT NOT NULL,
                departure_lat REAL NOT NULL,
                departure_lng REAL NOT NULL,
                arrival_lat REAL NOT NULL,
                arrival_lng REAL NOT NULL,
                airline TEXT,
                flight_number TEXT,
                cabin_class TEXT,
                passengers TEXT NOT NULL DEFAULT '[]',
                notes TEXT,
                source_message_id TEXT NOT NULL,
                source_subject TEXT,
                source_sent_at TEXT,
                source_body TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_flight_records_user ON flight_records(user_email);
            CREATE INDEX IF NOT EXISTS idx_flight_records_user_date ON flight_records(user_email, flight_date);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        // SQLite treats NULLs as distinct in unique indexes, so rows missing
        // a confirmation or flight number never collide here. Reconciliation
        // relies on that exemption; do not add NOT NULL to these columns.
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_flight_records_identity ON flight_records(
                user_email, confirmation_number, flight_date,
                departure_airport, arrival_airport, flight_number
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert_row<'e, E>(executor: E, record: &FlightRecord) -> std::result::Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let passengers =
            serde_json::to_string(&record.passengers).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            r#"
            INSERT INTO flight_records (
                id, user_email, confirmation_number, flight_date, departure_time,
                arrival_time, departure_airport, arrival_airport, departure_city, arrival_city,
                departure_lat, departure_lng, arrival_lat, arrival_lng, airline, flight_number,
                cabin_class, passengers, notes, source_message_id, source_subject, source_sent_at,
                source_body, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.user_email)
        .bind(&record.confirmation_number)
        .bind(record.flight_date.to_string())
        .bind(record.departure_time.map(|t| t.format("%H:%M:%S").to_string()))
        .bind(record.arrival_time.map(|t| t.format("%H:%M:%S").to_string()))
        .bind(&record.departure_airport)
        .bind(&record.arrival_airport)
        .bind(&record.departure_city)
        .bind(&record.arrival_city)
        .bind(record.departure_lat)
        .bind(record.departure_lng)
        .bind(record.arrival_lat)
        .bind(record.arrival_lng)
        .bind(&record.airline)
        .bind(&record.flight_number)
        .bind(&record.cabin_class)
        .bind(passengers)
        .bind(&record.notes)
        .bind(&record.source_message_id)
        .bind(&record.source_subject)
        .bind(record.source_sent_at.map(|t| t.to_rfc3339()))
        .bind(&record.source_body)
        .bind(record.created_at.to_rfc3339())
        .execute(executor)
        .await
        .map(|_| ())
    }

    fn map_insert_error(e: sqlx::Error) -> FlightLogError {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                FlightLogError::DuplicateRecord
            }
            _ => FlightLogError::Storage(e.to_string().into()),
        }
    }

    fn year_bounds(year: i32) -> (String, String) {
        (format!("{:04}-01-01", year), format!("{:04}-12-31", year))
    }
}

// Row type for sqlx queries
#[derive(Debug, FromRow)]
struct RecordRow {
    id: String,
    user_email: String,
    confirmation_number: Option<String>,
    flight_date: String,
    departure_time: Option<String>,
    arrival_time: Option<String>,
    departure_airport: String,
    arrival_airport: String,
    departure_city: String,
    arrival_city: String,
    departure_lat: f64,
    departure_lng: f64,
    arrival_lat: f64,
    arrival_lng: f64,
    airline: Option<String>,
    flight_number: Option<String>,
    cabin_class: Option<String>,
    passengers: String,
    notes: Option<String>,
    source_message_id: String,
    source_subject: Option<String>,
    source_sent_at: Option<String>,
    source_body: Option<String>,
    created_at: String,
}

impl RecordRow {
    fn into_record(self) -> Result<FlightRecord> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| FlightLogError::Storage(format!("Invalid id: {}", e).into()))?;

        let flight_date = NaiveDate::parse_from_str(&self.flight_date, "%Y-%m-%d")
            .map_err(|e| FlightLogError::Storage(format!("Invalid date: {}", e).into()))?;

        let departure_time = self
            .departure_time
            .as_deref()
            .map(|t| chrono::NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .transpose()
            .map_err(|e| FlightLogError::Storage(format!("Invalid time: {}", e).into()))?;

        let arrival_time = self
            .arrival_time
            .as_deref()
            .map(|t| chrono::NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .transpose()
            .map_err(|e| FlightLogError::Storage(format!("Invalid time: {}", e).into()))?;

        let source_sent_at = self
            .source_sent_at
            .as_deref()
            .map(chrono::DateTime::parse_from_rfc3339)
            .transpose()
            .map_err(|e| FlightLogError::Storage(format!("Invalid date: {}", e).into()))?
            .map(|t| t.with_timezone(&chrono::Utc));

        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| FlightLogError::Storage(format!("Invalid date: {}", e).into()))?
            .with_timezone(&chrono::Utc);

        let passengers: Vec<String> = serde_json::from_str(&self.passengers)
            .map_err(|e| FlightLogError::Storage(format!("Invalid passengers JSON: {}", e).into()))?;

        Ok(FlightRecord {
            id,
            user_email: self.user_email,
            confirmation_number: self.confirmation_number,
            flight_date,
            departure_time,
            arrival_time,
            departure_airport: self.departure_airport,
            arrival_airport: self.arrival_airport,
            departure_city: self.departure_city,
            arrival_city: self.arrival_city,
            departure_lat: self.departure_lat,
            departure_lng: self.departure_lng,
            arrival_lat: self.arrival_lat,
            arrival_lng: self.arrival_lng,
            airline: self.airline,
            flight_number: self.flight_number,
            cabin_class: self.cabin_class,
            passengers,
            notes: self.notes,
            source_message_id: self.source_message_id,
            source_subject: self.source_subject,
            source_sent_at,
            source_body: self.source_body,
            created_at,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert(&self, record: FlightRecord) -> Result<FlightRecord> {
        Self::insert_row(&self.pool, &record)
            .await
            .map_err(Self::map_insert_error)?;
        Ok(record)
    }

    async fn replace(
        &self,
        user_email: &str,
        superseded: &[Uuid],
        record: FlightRecord,
    ) -> Result<FlightRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        for id in superseded {
            sqlx::query("DELETE FROM flight_records WHERE id = ? AND user_email = ?")
                .bind(id.to_string())
                .bind(user_email)
                .execute(&mut *tx)
                .await
                .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;
        }

        Self::insert_row(&mut *tx, &record)
            .await
            .map_err(Self::map_insert_error)?;

        tx.commit()
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        Ok(record)
    }

    async fn delete(&self, user_email: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM flight_records WHERE id = ? AND user_email = ?")
            .bind(id.to_string())
            .bind(user_email)
            .execute(&self.pool)
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_identity_match(&self, key: IdentityKey<'_>) -> Result<Option<FlightRecord>> {
        let query = format!(
            "SELECT {} FROM flight_records \
             WHERE user_email = ? AND confirmation_number = ? AND flight_date = ? \
               AND departure_airport = ? AND arrival_airport = ? AND flight_number = ?",
            COLUMNS
        );

        let row = sqlx::query_as::<_, RecordRow>(&query)
            .bind(key.user_email)
            .bind(key.confirmation_number)
            .bind(key.flight_date.to_string())
            .bind(key.departure_airport)
            .bind(key.arrival_airport)
            .bind(key.flight_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        match row {
            Some(r) => Ok(Some(r.into_record()?)),
            None => Ok(None),
        }
    }

    async fn find_change_matches(&self, key: ChangeKey<'_>) -> Result<Vec<FlightRecord>> {
        // A NULL bind disables its disjunct, mirroring ChangeKey::matches.
        let query = format!(
            "SELECT {} FROM flight_records \
             WHERE user_email = ? \
               AND ((? IS NOT NULL AND confirmation_number = ?) \
                 OR (? IS NOT NULL AND flight_number = ? \
                     AND departure_airport = ? AND arrival_airport = ?))",
            COLUMNS
        );

        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(key.user_email)
            .bind(key.confirmation_number)
            .bind(key.confirmation_number)
            .bind(key.flight_number)
            .bind(key.flight_number)
            .bind(key.departure_airport)
            .bind(key.arrival_airport)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    async fn list_for_user(&self, user_email: &str, year: Option<i32>) -> Result<Vec<FlightRecord>> {
        let rows = match year {
            Some(y) => {
                let (start, end) = Self::year_bounds(y);
                let query = format!(
                    "SELECT {} FROM flight_records \
                     WHERE user_email = ? AND flight_date BETWEEN ? AND ? \
                     ORDER BY flight_date DESC, created_at DESC",
                    COLUMNS
                );
                sqlx::query_as::<_, RecordRow>(&query)
                    .bind(user_email)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {} FROM flight_records WHERE user_email = ? \
                     ORDER BY flight_date DESC, created_at DESC",
                    COLUMNS
                );
                sqlx::query_as::<_, RecordRow>(&query)
                    .bind(user_email)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    async fn find_by_date_range(
        &self,
        user_email: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FlightRecord>> {
        let query = format!(
            "SELECT {} FROM flight_records \
             WHERE user_email = ? AND flight_date BETWEEN ? AND ? \
             ORDER BY flight_date DESC, created_at DESC",
            COLUMNS
        );

        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(user_email)
            .bind(start.to_string())
            .bind(end.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    async fn find_by_airport(&self, user_email: &str, code: &str) -> Result<Vec<FlightRecord>> {
        let query = format!(
            "SELECT {} FROM flight_records \
             WHERE user_email = ? AND (departure_airport = ? OR arrival_airport = ?) \
             ORDER BY flight_date DESC, created_at DESC",
            COLUMNS
        );

        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(user_email)
            .bind(code)
            .bind(code)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    async fn find_by_message_ids(
        &self,
        user_email: &str,
        message_ids: &[String],
    ) -> Result<Vec<FlightRecord>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = message_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT {} FROM flight_records \
             WHERE user_email = ? AND source_message_id IN ({})",
            COLUMNS, placeholders
        );

        let mut q = sqlx::query_as::<_, RecordRow>(&query).bind(user_email);
        for id in message_ids {
            q = q.bind(id);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    async fn count_for_user(&self, user_email: &str, year: Option<i32>) -> Result<u64> {
        let count: (i64,) = match year {
            Some(y) => {
                let (start, end) = Self::year_bounds(y);
                sqlx::query_as(
                    "SELECT COUNT(*) FROM flight_records \
                     WHERE user_email = ? AND flight_date BETWEEN ? AND ?",
                )
                .bind(user_email)
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM flight_records WHERE user_email = ?")
                    .bind(user_email)
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| FlightLogError::Storage(e.to_string().into()))?;

        Ok(count.0 as u64)
    }
}
