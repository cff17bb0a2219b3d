use crate::AppState;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cellgraph_protocol::{AnalysisResponse, JobStatusResponse};
use cellgraph_service::{analyze_sheets, AnalysisOptions, JobStore};
use cellgraph_workbook::{read_workbook, validate_extension};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use uuid::Uuid;

/// JSON error envelope with an HTTP status.
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Per-request analysis switches, mirroring [`AnalysisOptions`].
#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeParams {
    #[serde(default)]
    include_values: bool,
    #[serde(default = "default_true")]
    detect_anomalies: bool,
    #[serde(default = "default_true")]
    identify_cost_drivers: bool,
    top_drivers_count: Option<usize>,
}

fn default_true() -> bool {
    true
}

/// `POST /api/v1/analyze` — accept a workbook upload and start a
/// background analysis job.
pub(crate) async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    mut multipart: Multipart,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or("workbook.xlsx"));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::bad_request("missing multipart field 'file'"));
    };
    validate_extension(std::path::Path::new(&file_name))
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if bytes.len() > state.config.max_upload_bytes() {
        return Err(ApiError::bad_request(format!(
            "file too large, maximum size: {}MB",
            state.config.max_file_size_mb
        )));
    }

    let file_size = bytes.len() as u64;
    let job_id = state.store.create(&file_name, file_size);
    let path = state.upload_root.join(format!("{job_id}_{file_name}"));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;

    let options = AnalysisOptions {
        include_values: params.include_values,
        detect_anomalies: params.detect_anomalies,
        identify_cost_drivers: params.identify_cost_drivers,
        top_drivers_count: params
            .top_drivers_count
            .unwrap_or(state.config.top_drivers_default),
    };

    log::info!("analysis job {job_id} created for '{file_name}' ({file_size} bytes)");
    tokio::spawn(run_analysis(state.store.clone(), job_id, path, options));

    let Some(job) = state.store.get(job_id) else {
        return Err(ApiError::internal("job vanished after creation"));
    };
    Ok(Json(job.status()))
}

/// Background task owning one analysis run. The uploaded file is
/// removed when the run finishes, success or failure.
async fn run_analysis(store: JobStore, job_id: Uuid, path: PathBuf, options: AnalysisOptions) {
    let worker_store = store.clone();
    let worker_path = path.clone();
    let outcome = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        worker_store.update_progress(job_id, 10, "Reading workbook");
        let sheets = read_workbook(&worker_path)?;
        worker_store.update_progress(job_id, 30, &format!("Read {} sheets", sheets.len()));
        let report = analyze_sheets(&sheets, &options, |progress, message| {
            worker_store.update_progress(job_id, progress, message);
        })?;
        Ok(report)
    })
    .await;

    match outcome {
        Ok(Ok(report)) => store.complete(job_id, report),
        Ok(Err(err)) => store.fail(job_id, err.to_string()),
        Err(err) => store.fail(job_id, format!("analysis task panicked: {err}")),
    }

    if let Err(err) = tokio::fs::remove_file(&path).await {
        log::warn!("failed to remove upload {}: {err}", path.display());
    }
}

/// `GET /api/v1/analysis/{job_id}` — full job view including the report
/// once completed.
pub(crate) async fn analysis_result(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Some(job) = state.store.get(job_id) else {
        return Err(ApiError::not_found("job not found"));
    };
    Ok(Json(job.response()))
}

/// `GET /api/v1/analysis/{job_id}/status` — progress polling.
pub(crate) async fn analysis_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let Some(job) = state.store.get(job_id) else {
        return Err(ApiError::not_found("job not found"));
    };
    Ok(Json(job.status()))
}

/// `GET /api/v1/health` — liveness probe.
pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Strip any path components an uploaded file name tries to smuggle in.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect();
    if cleaned.is_empty() {
        "workbook.xlsx".to_string()
    } else {
        cleaned
    }
}
