//! Repository Implementation

use crate::StorageError;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

/// Rows per multi-value INSERT (two bound parameters each)
const SPIKE_INSERT_CHUNK: usize = 400;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS spike_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date_time TEXT NOT NULL,
        value REAL
    )",
    "CREATE TABLE IF NOT EXISTS station_names (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        station_name TEXT NOT NULL
    )",
];

/// Cleaned reading as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeRecord {
    /// Timestamp text exactly as uploaded
    pub date_time: String,
    pub value: Option<f64>,
}

impl SpikeRecord {
    pub fn new(date_time: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            date_time: date_time.into(),
            value,
        }
    }
}

/// Repository for data access
#[derive(Debug, Clone)]
pub struct Repository {
    pub(crate) pool: SqlitePool,
}

impl Repository {
    /// Connect to a SQLite database URL, creating the file if needed
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        info!("Opening SQLite repository at {}", database_url);
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Create a private in-memory repository
    ///
    /// Limited to a single connection that never expires: each SQLite
    /// memory connection holds its own database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        info!("Creating in-memory repository");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        debug!("Schema ready");
        Ok(())
    }

    /// Replace the whole stored series with `records`
    ///
    /// Runs in one transaction so readers never see a partial dataset.
    pub async fn replace_spike_data(&self, records: &[SpikeRecord]) -> Result<usize, StorageError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM spike_data")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for chunk in records.chunks(SPIKE_INSERT_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO spike_data (date_time, value) ");
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.date_time.clone())
                    .push_bind(record.value);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(
            "Replaced spike data: {} removed, {} stored",
            deleted,
            records.len()
        );
        Ok(records.len())
    }

    /// Records whose timestamp text lies within the given bounds, in upload order
    ///
    /// Bounds are compared as strings, inclusive on both ends; `None` leaves
    /// that side open.
    pub async fn spike_data_in_range(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<SpikeRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT date_time, value FROM spike_data
             WHERE (? IS NULL OR date_time >= ?)
               AND (? IS NULL OR date_time <= ?)
             ORDER BY id",
        )
        .bind(start)
        .bind(start)
        .bind(end)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<SpikeRecord, StorageError> {
                Ok(SpikeRecord {
                    date_time: row.try_get::<String, _>("date_time")?,
                    value: row.try_get::<Option<f64>, _>("value")?,
                })
            })
            .collect()
    }

    /// All stored records in upload order
    pub async fn all_spike_data(&self) -> Result<Vec<SpikeRecord>, StorageError> {
        self.spike_data_in_range(None, None).await
    }

    /// Number of stored spike records
    pub async fn spike_count(&self) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spike_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
