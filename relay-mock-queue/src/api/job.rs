//! Ingest job status
//!
//! Ingest finishes synchronously here, so any known job reports `Success`.

use axum::{
    Json,
    extract::{Path, State},
};
use relay_core::dto::ingest::{JobResultData, JobStatusData, JobStatusResponse};

use crate::store::MockState;

/// GET /job/{id}
pub async fn get_ingest_job(
    State(state): State<MockState>,
    Path(job_id): Path<String>,
) -> Json<JobStatusResponse> {
    let data = match state.ingest_result(&job_id) {
        Some(data_id) => JobStatusData {
            job_id,
            status: "Success".to_string(),
            result: Some(JobResultData {
                data_id,
                message: String::new(),
            }),
        },
        None => JobStatusData {
            job_id,
            status: "Error".to_string(),
            result: Some(JobResultData {
                data_id: String::new(),
                message: "Job Not Found.".to_string(),
            }),
        },
    };

    Json(JobStatusResponse { data })
}
