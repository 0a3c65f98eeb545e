//! Task API Handlers
//!
//! The two endpoints dispatchers and workers talk to: pull the next job for a
//! service, and report a job's status.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use relay_core::domain::status::StatusUpdate;
use relay_core::dto::queue::TaskEnvelope;

use crate::api::error::{ApiError, ApiResult};
use crate::store::MockState;

fn check_service(state: &MockState, service_id: &str) -> ApiResult<()> {
    if service_id != state.service_id() {
        return Err(ApiError::NotFound(format!(
            "Service {} not found",
            service_id
        )));
    }
    Ok(())
}

/// POST /service/{id}/task
/// Hand out the next pending job, or an empty envelope when there is none
pub async fn poll_task(
    State(state): State<MockState>,
    Path(service_id): Path<String>,
) -> ApiResult<Json<TaskEnvelope>> {
    check_service(&state, &service_id)?;

    match state.next_job() {
        Some(job) => {
            tracing::info!(job_id = %job.job_id, "Handing out job");
            Ok(Json(TaskEnvelope::new(job.job_id, job.content)))
        }
        None => {
            tracing::debug!("No pending jobs");
            Ok(Json(TaskEnvelope::default()))
        }
    }
}

/// POST /service/{id}/task/{job_id}
/// Record a status report for a job
pub async fn report_status(
    State(state): State<MockState>,
    Path((service_id, job_id)): Path<(String, String)>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<StatusCode> {
    check_service(&state, &service_id)?;

    tracing::info!(job_id = %job_id, status = %update.status, "Status reported");
    state.record_status(&job_id, update);

    Ok(StatusCode::OK)
}
