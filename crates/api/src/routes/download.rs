//! Spike Data Export Route

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use export::{write_csv, DateRange, EXPORT_FILENAME};
use tracing::info;

use crate::error::ApiError;
use crate::session::Session;
use crate::telemetry;
use crate::SharedState;

/// Download stored records within the session's date range as CSV
pub async fn export_csv(State(state): State<SharedState>, session: Session) -> Result<Response, ApiError> {
    let params = state.sessions.get(&session.id).await;
    let range = DateRange::from_session(&params.start_date, &params.end_date)?;
    info!(start = ?range.start, end = ?range.end, "Exporting spike data");

    let records = state
        .repository
        .spike_data_in_range(range.start.as_deref(), range.end.as_deref())
        .await?;
    let body = write_csv(&records)?;
    telemetry::record_export(records.len());

    let headers = [
        (CONTENT_TYPE, "text/csv".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{EXPORT_FILENAME}\""),
        ),
    ];
    Ok(session.attach((headers, body).into_response()))
}
