//! Station Name Reference Data

use crate::{Repository, StorageError};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;

/// Rows per INSERT when bulk-loading station names
pub const DEFAULT_STATION_BATCH_SIZE: usize = 500;

/// SQLite's default cap on bound parameters per statement
const MAX_BOUND_PARAMETERS: usize = 999;

/// Station lookup row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRecord {
    pub id: i64,
    pub station_name: String,
}

impl Repository {
    /// Bulk-insert station names in batches, returning the number inserted
    pub async fn insert_station_names(
        &self,
        names: &[String],
        batch_size: usize,
    ) -> Result<usize, StorageError> {
        let batch_size = batch_size.clamp(1, MAX_BOUND_PARAMETERS);
        let mut tx = self.pool.begin().await?;

        for batch in names.chunks(batch_size) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO station_names (station_name) ");
            builder.push_values(batch, |mut row, name| {
                row.push_bind(name.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(
            "Inserted {} station names in batches of {}",
            names.len(),
            batch_size
        );
        Ok(names.len())
    }

    /// All stations ordered by id
    pub async fn list_stations(&self) -> Result<Vec<StationRecord>, StorageError> {
        let rows = sqlx::query("SELECT id, station_name FROM station_names ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<StationRecord, StorageError> {
                Ok(StationRecord {
                    id: row.try_get::<i64, _>("id")?,
                    station_name: row.try_get::<String, _>("station_name")?,
                })
            })
            .collect()
    }

    /// Look up a station name by id
    pub async fn station_name(&self, id: i64) -> Result<Option<String>, StorageError> {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT station_name FROM station_names WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(name)
    }
}
