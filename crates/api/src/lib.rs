//! Spike Data Cleaning API Server
//!
//! Accepts CSV/XLSX uploads, cleans them with the series sanitizer, stores
//! the result and serves range-filtered CSV exports.

use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use series_sanitizer::Sanitizer;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod telemetry;

pub use config::AppConfig;
pub use error::ApiError;
pub use session::{Session, SessionParams, SessionStore};
pub use telemetry::init_logging;

use rate_limit::create_governor_config;
use storage::Repository;

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    /// Session-remembered filter parameters
    pub sessions: SessionStore,
    /// Sanitizer built from configuration
    pub sanitizer: Sanitizer,
    pub config: AppConfig,
    /// Prometheus handle when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Create new application state
    pub fn new(repository: Repository, config: AppConfig) -> Self {
        Self {
            repository,
            sessions: SessionStore::with_idle_timeout(config.session_idle_timeout()),
            sanitizer: config.sanitizer.build(),
            config,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: SystemMetrics,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub spike_count: usize,
    pub station_count: usize,
    pub active_sessions: usize,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    let mut uploads = Router::new()
        .route(
            "/api/v1/spikedata",
            get(routes::spikedata::get_page).post(routes::spikedata::submit),
        )
        .route(
            "/api/v1/stations/upload",
            post(routes::stations::upload_stations),
        );

    if let Some(governor) = create_governor_config(&state.config.rate_limit) {
        uploads = uploads.layer(GovernorLayer { config: governor });
    }

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/spikedata/export", get(routes::download::export_csv))
        .route("/api/v1/stations", get(routes::stations::list_stations))
        .route("/metrics", get(metrics_handler))
        .merge(uploads)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let spike_count = state.repository.spike_count().await;
    let station_count = state
        .repository
        .list_stations()
        .await
        .map(|s| s.len())
        .unwrap_or(0);

    let (status, database) = match &spike_count {
        Ok(_) => (
            "healthy",
            ComponentHealth {
                status: "ok".to_string(),
                error: None,
            },
        ),
        Err(err) => (
            "degraded",
            ComponentHealth {
                status: "error".to_string(),
                error: Some(err.to_string()),
            },
        ),
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus { database },
        metrics: SystemMetrics {
            spike_count: spike_count.unwrap_or(0),
            station_count,
            active_sessions: state.sessions.len().await,
        },
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<SharedState>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// Run the server
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let repository = Repository::connect(&config.database_url).await?;
    let addr = config.bind_addr.clone();

    let state = Arc::new(AppState::new(repository, config).with_metrics(telemetry::install_metrics()));
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XSPIKEBOUNDARY";

    async fn test_app() -> (Router, SharedState) {
        let repository = Repository::in_memory().await.unwrap();
        let state = Arc::new(AppState::new(repository, AppConfig::for_testing()));
        (create_router(state.clone()), state)
    }

    /// Multipart body from text fields and an optional file part
    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((field, filename, content)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// `name=value` part of the Set-Cookie header
    fn session_cookie(response: &Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    /// 40 readings at 15-minute spacing on 01/01/2024 with a sentinel at 20
    fn sample_csv() -> String {
        let mut csv = String::from("dateTime,value\n");
        for i in 0..40 {
            let value = if i == 20 { "9999.0" } else { "10.0" };
            csv.push_str(&format!(
                "01/01/2024 {:02}:{:02},{}\n",
                i / 4,
                (i % 4) * 15,
                value
            ));
        }
        csv.push_str("02/01/2024 00:00,10.0\n");
        csv
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app().await;
        let response = app.oneshot(get_request("/api/v1/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["metrics"]["spike_count"], 0);
    }

    #[tokio::test]
    async fn test_page_sets_session_cookie() {
        let (app, _) = test_app().await;
        let response = app.oneshot(get_request("/api/v1/spikedata", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).starts_with("spike_session="));
        let json = body_json(response).await;
        assert_eq!(json["summary"]["total_data_points"], 0);
    }

    #[tokio::test]
    async fn test_upload_cleans_and_exports() {
        let (app, state) = test_app().await;
        let csv = sample_csv();

        let body = multipart_body(
            &[
                ("start_date", "2024-01-01"),
                ("end_date", "2024-01-01"),
                ("rate_of_change", "5"),
            ],
            Some(("file_upload", "levels.csv", csv.as_bytes())),
        );
        let response = app
            .clone()
            .oneshot(multipart_request("/api/v1/spikedata", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["summary"]["total_data_points"], 41);
        assert_eq!(json["summary"]["invalid_data_points"], 1);
        assert_eq!(json["summary"]["abnormal_data_points"], 1);
        assert_eq!(json["summary"]["stored_start_date"], "01/01/2024");
        assert_eq!(json["summary"]["stored_rate_of_change"], "5");
        assert_eq!(json["summary"]["last_uploaded_file_name"], "levels.csv");
        assert_eq!(state.repository.spike_count().await.unwrap(), 41);

        let response = app
            .oneshot(get_request("/api/v1/spikedata/export", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"spike_data.csv\""
        );

        let csv = body_text(response).await;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "dateTime,value");
        // The next-day reading falls outside the range
        assert_eq!(lines.len(), 41);
        assert_eq!(lines[21], "01/01/2024 05:00,10.0");
    }

    #[tokio::test]
    async fn test_filter_only_submit_remembers_parameters() {
        let (app, _) = test_app().await;
        let body = multipart_body(&[("start_date", "2024-05-06"), ("end_date", "")], None);

        let response = app
            .clone()
            .oneshot(multipart_request("/api/v1/spikedata", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);

        let response = app
            .oneshot(get_request("/api/v1/spikedata", Some(&cookie)))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["summary"]["stored_start_date"], "06/05/2024");
        assert_eq!(json["summary"]["stored_end_date"], "");
    }

    #[tokio::test]
    async fn test_invalid_date_rejected() {
        let (app, _) = test_app().await;
        let body = multipart_body(&[("start_date", "06/05/2024")], None);

        let response = app
            .oneshot(multipart_request("/api/v1/spikedata", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid date format. Please use YYYY-MM-DD format.");
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected() {
        let (app, _) = test_app().await;
        let body = multipart_body(&[], Some(("file_upload", "levels.txt", b"1,2")));

        let response = app
            .oneshot(multipart_request("/api/v1/spikedata", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Unsupported file format.");
    }

    #[tokio::test]
    async fn test_failed_upload_still_sets_session_cookie() {
        let (app, state) = test_app().await;
        let body = multipart_body(
            &[("start_date", "2024-02-01")],
            Some(("file_upload", "levels.txt", b"1,2")),
        );

        let response = app
            .clone()
            .oneshot(multipart_request("/api/v1/spikedata", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let cookie = session_cookie(&response);
        assert_eq!(state.sessions.len().await, 1);

        let response = app
            .oneshot(get_request("/api/v1/spikedata", Some(&cookie)))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["summary"]["stored_start_date"], "01/02/2024");
        assert_eq!(json["last_uploaded_file_name"], "levels.txt");
    }

    #[tokio::test]
    async fn test_station_selection_resolved() {
        let (app, state) = test_app().await;
        state
            .repository
            .insert_station_names(&["Riverside".to_string()], 500)
            .await
            .unwrap();
        let station_id = state.repository.list_stations().await.unwrap()[0].id.to_string();

        let body = multipart_body(&[("station_name", station_id.as_str())], None);
        let response = app
            .clone()
            .oneshot(multipart_request("/api/v1/spikedata", body, None))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["summary"]["stored_station_name"], "Riverside");
        assert_eq!(json["stations"][0]["station_name"], "Riverside");

        let response = app.oneshot(get_request("/api/v1/stations", None)).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_station_upload_requires_file() {
        let (app, _) = test_app().await;
        let body = multipart_body(&[("other", "x")], None);

        let response = app
            .oneshot(multipart_request("/api/v1/stations/upload", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_without_dates_returns_everything() {
        let (app, state) = test_app().await;
        state
            .repository
            .replace_spike_data(&[
                storage::SpikeRecord::new("01/01/2024 00:00", Some(1.5)),
                storage::SpikeRecord::new("15/03/2024 12:30", Some(2.0)),
            ])
            .await
            .unwrap();

        let response = app
            .oneshot(get_request("/api/v1/spikedata/export", None))
            .await
            .unwrap();
        assert_eq!(
            body_text(response).await,
            "dateTime,value\n01/01/2024 00:00,1.5\n15/03/2024 12:30,2.0\n"
        );
    }
}
