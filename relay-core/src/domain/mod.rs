//! Core domain types
//!
//! These types describe the unit of work as it moves through the system:
//! a job pulled from the queue, the task submitted to the execution platform,
//! and the status/output reported back once the worker finishes.

pub mod job;
pub mod output;
pub mod status;
pub mod task;
