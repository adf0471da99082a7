//! Station Routes

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use storage::StationRecord;
use tracing::info;
use upload_parser::first_column_values;

use crate::error::ApiError;
use crate::SharedState;

pub const STATION_UPLOAD_MESSAGE: &str = "Data successfully uploaded!";

/// Response for the station bulk upload
#[derive(Debug, Serialize)]
pub struct StationUploadResponse {
    pub inserted: usize,
    pub message: String,
}

/// List all stations
pub async fn list_stations(
    State(state): State<SharedState>,
) -> Result<Json<Vec<StationRecord>>, ApiError> {
    Ok(Json(state.repository.list_stations().await?))
}

/// Bulk-load station names from the first column of an uploaded workbook
pub async fn upload_stations(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<StationUploadResponse>, ApiError> {
    let mut workbook = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("excel_file") {
            workbook = Some(field.bytes().await?);
        }
    }
    let bytes = workbook.ok_or_else(|| ApiError::BadRequest("No excel_file provided.".to_string()))?;

    let names = tokio::task::spawn_blocking(move || first_column_values(&bytes))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))??;

    let inserted = state
        .repository
        .insert_station_names(&names, state.config.station_batch_size)
        .await?;
    info!("Loaded {} station names", inserted);

    Ok(Json(StationUploadResponse {
        inserted,
        message: STATION_UPLOAD_MESSAGE.to_string(),
    }))
}
