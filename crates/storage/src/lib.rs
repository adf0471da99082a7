//! Storage Layer
//!
//! SQLite persistence for the cleaned spike series and the station-name
//! lookup table, using the repository pattern.

mod repository;
mod stations;

pub use repository::{Repository, SpikeRecord};
pub use stations::{StationRecord, DEFAULT_STATION_BATCH_SIZE};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            other => StorageError::DatabaseError(other.to_string()),
        }
    }
}
