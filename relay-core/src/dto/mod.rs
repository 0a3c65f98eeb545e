//! Data Transfer Objects for the job queue API
//!
//! Wire representations of the queue's request and response bodies. Field
//! names follow the queue's JSON conventions, not Rust's.

pub mod ingest;
pub mod queue;
pub mod service;
