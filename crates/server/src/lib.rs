//! # Cellgraph Server
//!
//! Thin HTTP frontend over the analysis service.
//!
//! Workbooks are submitted as multipart uploads; analysis runs in a
//! background task while the client polls job status by id. The
//! uploaded file lives in scoped storage and is removed when its
//! analysis finishes, regardless of outcome.
//!
//! Endpoints (under `/api/v1`):
//! - `POST /analyze` — upload a workbook, start a job
//! - `GET /analysis/{job_id}` — full result once completed
//! - `GET /analysis/{job_id}/status` — progress polling
//! - `GET /health` — liveness probe

mod config;
mod routes;

pub use config::ServerConfig;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use cellgraph_service::JobStore;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: JobStore,
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) upload_root: PathBuf,
    /// Keeps scoped upload storage alive for the server lifetime.
    _upload_guard: Option<Arc<TempDir>>,
}

impl AppState {
    fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let (upload_root, guard) = match &config.upload_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating upload dir {}", dir.display()))?;
                (dir.clone(), None)
            }
            None => {
                let temp = TempDir::new().context("creating temporary upload dir")?;
                (temp.path().to_path_buf(), Some(Arc::new(temp)))
            }
        };
        Ok(Self {
            store: JobStore::new(),
            config: Arc::new(config),
            upload_root,
            _upload_guard: guard,
        })
    }
}

/// Build the router for the given configuration.
pub fn app(config: ServerConfig) -> anyhow::Result<Router> {
    let max_upload = config.max_upload_bytes();
    let state = AppState::new(config)?;
    Ok(Router::new()
        .route("/api/v1/analyze", post(routes::analyze))
        .route("/api/v1/analysis/:job_id", get(routes::analysis_result))
        .route(
            "/api/v1/analysis/:job_id/status",
            get(routes::analysis_status),
        )
        .route("/api/v1/health", get(routes::health))
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state))
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr.clone();
    let router = app(config)?;
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    log::info!("cellgraph server listening on {bind_addr}");
    axum::serve(listener, router).await.context("server error")
}
