//! Admin endpoints
//!
//! Not part of the real queue API. Used to seed jobs and inspect what the
//! dispatcher and workers sent.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use relay_core::dto::ingest::{JobCreated, JobCreatedData};
use serde::Deserialize;

use crate::store::{MockState, RecordedIngest, RecordedStatus};

#[derive(Debug, Deserialize)]
pub struct EnqueueJob {
    /// Raw job JSON, delivered verbatim as the envelope content
    pub content: String,
    #[serde(rename = "jobId", default)]
    pub job_id: Option<String>,
}

/// POST /mock/jobs
pub async fn enqueue_job(
    State(state): State<MockState>,
    Json(req): Json<EnqueueJob>,
) -> (StatusCode, Json<JobCreated>) {
    let job_id = state.enqueue(req.job_id, req.content);
    tracing::info!(job_id = %job_id, "Job enqueued");

    (
        StatusCode::CREATED,
        Json(JobCreated {
            data: JobCreatedData { job_id },
        }),
    )
}

/// GET /mock/statuses
pub async fn list_statuses(State(state): State<MockState>) -> Json<Vec<RecordedStatus>> {
    Json(state.statuses())
}

/// GET /mock/ingests
pub async fn list_ingests(State(state): State<MockState>) -> Json<Vec<RecordedIngest>> {
    Json(state.ingests())
}
