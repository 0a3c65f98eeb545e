//! Relay Mock Queue
//!
//! An in-memory stand-in for the job queue HTTP API. Jobs are enqueued
//! through admin endpoints, handed out by the poll endpoint, and every status
//! report and ingest is kept for inspection.

pub mod api;
pub mod store;

pub use api::create_router;
pub use store::MockState;
