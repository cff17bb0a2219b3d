use cellgraph_protocol::{AnalysisReport, AnalysisResponse, JobState, JobStatusResponse};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One tracked analysis job.
///
/// Mutated only by the task that owns the analysis; status and result
/// queries read snapshots.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: u64,
    pub state: JobState,
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_secs: Option<f64>,
    pub result: Option<Arc<AnalysisReport>>,
    pub error: Option<String>,
}

impl Job {
    fn new(id: Uuid, file_name: String, file_size: u64) -> Self {
        Self {
            id,
            file_name,
            file_size,
            state: JobState::Processing,
            progress: 0,
            message: "File uploaded, starting analysis".to_string(),
            created_at: Utc::now(),
            completed_at: None,
            processing_time_secs: None,
            result: None,
            error: None,
        }
    }

    /// Polling view of this job.
    #[must_use]
    pub fn status(&self) -> JobStatusResponse {
        JobStatusResponse {
            job_id: self.id,
            status: self.state,
            progress: self.progress,
            message: self.message.clone(),
        }
    }

    /// Full response view of this job.
    #[must_use]
    pub fn response(&self) -> AnalysisResponse {
        AnalysisResponse {
            job_id: self.id,
            status: self.state,
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            created_at: self.created_at,
            completed_at: self.completed_at,
            processing_time_secs: self.processing_time_secs,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Shared job table: job id → job state.
///
/// Jobs are created on submission, mutated by the owning analysis task
/// through the methods here, and read by status/result queries. Cloning
/// the store shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    inner: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in the `Processing` state and return its id.
    pub fn create(&self, file_name: impl Into<String>, file_size: u64) -> Uuid {
        let id = Uuid::new_v4();
        let job = Job::new(id, file_name.into(), file_size);
        if let Ok(mut jobs) = self.inner.write() {
            jobs.insert(id, job);
        }
        log::info!("created analysis job {id}");
        id
    }

    /// Record a progress milestone.
    pub fn update_progress(&self, id: Uuid, progress: u8, message: &str) {
        if let Ok(mut jobs) = self.inner.write() {
            if let Some(job) = jobs.get_mut(&id) {
                job.progress = progress;
                job.message = message.to_string();
            }
        }
    }

    /// Mark a job completed with its report.
    pub fn complete(&self, id: Uuid, report: AnalysisReport) {
        if let Ok(mut jobs) = self.inner.write() {
            if let Some(job) = jobs.get_mut(&id) {
                let now = Utc::now();
                job.state = JobState::Completed;
                job.progress = 100;
                job.message = "Analysis complete".to_string();
                job.processing_time_secs =
                    Some((now - job.created_at).num_milliseconds() as f64 / 1000.0);
                job.completed_at = Some(now);
                job.result = Some(Arc::new(report));
            }
        }
        log::info!("analysis job {id} completed");
    }

    /// Mark a job failed.
    pub fn fail(&self, id: Uuid, error: impl Into<String>) {
        let error = error.into();
        if let Ok(mut jobs) = self.inner.write() {
            if let Some(job) = jobs.get_mut(&id) {
                job.state = JobState::Failed;
                job.message = format!("Analysis failed: {error}");
                job.error = Some(error.clone());
            }
        }
        log::error!("analysis job {id} failed: {error}");
    }

    /// Snapshot of a job, if it exists.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.inner.read().ok()?.get(&id).cloned()
    }

    /// Number of tracked jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
