//! Data ingest handlers
//!
//! Text arrives inline as JSON; everything else arrives as multipart with a
//! `data` JSON part describing a `file` part.

use axum::{
    Json,
    extract::{Multipart, State},
};
use relay_core::dto::ingest::{IngestRequest, JobCreated, JobCreatedData};

use crate::api::error::{ApiError, ApiResult};
use crate::store::MockState;

fn created(job_id: String) -> Json<JobCreated> {
    Json(JobCreated {
        data: JobCreatedData { job_id },
    })
}

/// POST /data
pub async fn ingest_inline(
    State(state): State<MockState>,
    Json(request): Json<IngestRequest>,
) -> ApiResult<Json<JobCreated>> {
    let content = request
        .data
        .data_type
        .content
        .ok_or_else(|| ApiError::BadRequest("inline ingest without content".to_string()))?;

    tracing::info!(name = %request.data.metadata.name, "Inline ingest");

    let size = content.len();
    let job_id = state.record_ingest(
        request.data.metadata.name,
        request.data.data_type.kind,
        Some(content),
        size,
    );

    Ok(created(job_id))
}

/// POST /data/file
pub async fn ingest_file(
    State(state): State<MockState>,
    mut multipart: Multipart,
) -> ApiResult<Json<JobCreated>> {
    let mut request: Option<IngestRequest> = None;
    let mut size: Option<usize> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("invalid data part: {}", e)))?;
                request = Some(parsed);
            }
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                size = Some(bytes.len());
            }
            _ => {}
        }
    }

    let request = request.ok_or_else(|| ApiError::BadRequest("missing data part".to_string()))?;
    let size = match size {
        Some(0) | None => return Err(ApiError::BadRequest("missing or empty file part".to_string())),
        Some(n) => n,
    };

    tracing::info!(name = %request.data.metadata.name, size, "File ingest");

    let job_id = state.record_ingest(
        request.data.metadata.name,
        request.data.data_type.kind,
        None,
        size,
    );

    Ok(created(job_id))
}
