//! Spike Data Upload Routes

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use series_sanitizer::{DefectReport, SanitizedSeries};
use storage::{SpikeRecord, StationRecord};
use tracing::info;
use upload_parser::{parse_upload, ParseError, ParsedUpload};
use uuid::Uuid;

use crate::error::ApiError;
use crate::session::{Session, SessionParams};
use crate::telemetry;
use crate::SharedState;

pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded and data analyzed successfully.";

/// Summary shown alongside the remembered filter parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub total_data_points: usize,
    /// Rows dropped by the uploader for a blank or non-numeric value
    pub missing_data_points: usize,
    pub invalid_data_points: usize,
    pub abnormal_data_points: usize,
    pub last_uploaded_file_name: String,
    pub stored_start_date: String,
    pub stored_end_date: String,
    pub stored_rate_of_change: String,
    pub stored_station_name: String,
}

impl UploadSummary {
    /// Summary with zero counts reflecting the session's parameters
    pub fn from_session(params: &SessionParams, station_name: String) -> Self {
        Self {
            last_uploaded_file_name: params.uploaded_file_name.clone(),
            stored_start_date: params.start_date.clone(),
            stored_end_date: params.end_date.clone(),
            stored_rate_of_change: params.rate_of_change.clone(),
            stored_station_name: station_name,
            ..Default::default()
        }
    }

    fn with_counts(mut self, upload: &ParsedUpload, report: &DefectReport) -> Self {
        self.total_data_points = upload.len();
        self.missing_data_points = upload.missing_values;
        self.invalid_data_points = report.invalid_count;
        self.abnormal_data_points = report.abnormal_count;
        self
    }
}

/// Page state without an upload
#[derive(Debug, Serialize)]
pub struct SpikeDataPage {
    pub last_uploaded_file_name: String,
    pub summary: UploadSummary,
    pub stations: Vec<StationRecord>,
}

/// Response to a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub summary: UploadSummary,
    pub stations: Vec<StationRecord>,
}

struct UploadedFile {
    name: String,
    bytes: Bytes,
}

/// Fields of the filter/upload form
#[derive(Default)]
struct SpikeDataForm {
    start_date: String,
    end_date: String,
    rate_of_change: String,
    station_id: String,
    file: Option<UploadedFile>,
}

impl SpikeDataForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "start_date" => form.start_date = field.text().await?.trim().to_string(),
                "end_date" => form.end_date = field.text().await?.trim().to_string(),
                "rate_of_change" => form.rate_of_change = field.text().await?.trim().to_string(),
                "station_name" => form.station_id = field.text().await?.trim().to_string(),
                "file_upload" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    if !file_name.is_empty() {
                        form.file = Some(UploadedFile {
                            name: file_name,
                            bytes,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

/// Convert an optional `YYYY-MM-DD` form date; empty stays empty
fn form_date(raw: &str) -> Result<String, ApiError> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    Ok(export::parse_form_date(raw)?)
}

async fn resolve_station_name(state: &SharedState, station_id: &str) -> Result<String, ApiError> {
    let Ok(id) = station_id.parse::<i64>() else {
        return Ok(String::new());
    };
    Ok(state.repository.station_name(id).await?.unwrap_or_default())
}

/// Current page state for the session
pub async fn get_page(State(state): State<SharedState>, session: Session) -> Result<Response, ApiError> {
    let params = state.sessions.get(&session.id).await;
    let station_name = resolve_station_name(&state, &params.station_id).await?;
    let stations = state.repository.list_stations().await?;

    let page = SpikeDataPage {
        last_uploaded_file_name: params.uploaded_file_name.clone(),
        summary: UploadSummary::from_session(&params, station_name),
        stations,
    };
    Ok(session.attach(Json(page).into_response()))
}

/// Remember filter parameters and, when a file is attached, clean and store it
///
/// The session cookie is set on error responses too, so parameters stored
/// before a failed upload stay reachable.
pub async fn submit(State(state): State<SharedState>, session: Session, multipart: Multipart) -> Response {
    let response = match process_submission(&state, session.id, multipart).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    session.attach(response)
}

async fn process_submission(
    state: &SharedState,
    session_id: Uuid,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = SpikeDataForm::read(multipart).await?;

    let start_date = form_date(&form.start_date)?;
    let end_date = form_date(&form.end_date)?;

    let mut params = state
        .sessions
        .update(session_id, |p| {
            p.start_date = start_date;
            p.end_date = end_date;
            p.rate_of_change = form.rate_of_change.clone();
            p.station_id = form.station_id.clone();
        })
        .await;
    let station_name = resolve_station_name(state, &params.station_id).await?;

    let Some(file) = form.file else {
        let stations = state.repository.list_stations().await?;
        let page = SpikeDataPage {
            last_uploaded_file_name: params.uploaded_file_name.clone(),
            summary: UploadSummary::from_session(&params, station_name),
            stations,
        };
        return Ok(Json(page).into_response());
    };

    let file_name = file.name.clone();
    params = state
        .sessions
        .update(session_id, |p| p.uploaded_file_name = file_name.clone())
        .await;

    let sanitizer = state.sanitizer.clone();
    let (upload, sanitized) = tokio::task::spawn_blocking(
        move || -> Result<(ParsedUpload, SanitizedSeries), ParseError> {
            let upload = parse_upload(&file.name, &file.bytes)?;
            let sanitized = sanitizer.sanitize(&upload.readings());
            Ok((upload, sanitized))
        },
    )
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))??;

    let records: Vec<SpikeRecord> = upload
        .rows
        .iter()
        .zip(&sanitized.values)
        .map(|(row, value)| SpikeRecord::new(row.date_time.clone(), Some(*value)))
        .collect();
    state.repository.replace_spike_data(&records).await?;

    let report = sanitized.report;
    telemetry::record_upload(upload.len(), &report);
    info!(
        file = %file_name,
        rows = upload.len(),
        invalid = report.invalid_count,
        abnormal = report.abnormal_count,
        "Upload cleaned and stored"
    );

    let response = UploadResponse {
        success: true,
        message: UPLOAD_SUCCESS_MESSAGE.to_string(),
        summary: UploadSummary::from_session(&params, station_name).with_counts(&upload, &report),
        stations: state.repository.list_stations().await?,
    };
    Ok(Json(response).into_response())
}
