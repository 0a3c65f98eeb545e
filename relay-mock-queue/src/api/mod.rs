//! API Module
//!
//! HTTP surface of the mock queue. Paths mirror the real queue so clients
//! need nothing but a different base URL.

pub mod admin;
pub mod data;
pub mod error;
pub mod health;
pub mod job;
pub mod service;
pub mod task;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::store::MockState;

/// Create the mock queue router with all endpoints
pub fn create_router(state: MockState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Service endpoints
        .route("/service", get(service::list_services))
        .route("/service/{id}/task", post(task::poll_task))
        .route("/service/{id}/task/{job_id}", post(task::report_status))
        // Data ingest endpoints
        .route("/data", post(data::ingest_inline))
        .route("/data/file", post(data::ingest_file))
        .route("/job/{id}", get(job::get_ingest_job))
        // Admin endpoints
        .route("/mock/jobs", post(admin::enqueue_job))
        .route("/mock/statuses", get(admin::list_statuses))
        .route("/mock/ingests", get(admin::list_ingests))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
