//! Relay Core
//!
//! Core types shared by the dispatcher, the worker and the queue clients.
//!
//! This crate contains:
//! - Domain types: jobs, task submissions, status reports, worker output
//! - DTOs: wire shapes of the job queue API
//! - Config: the service JSON configuration model

pub mod config;
pub mod domain;
pub mod dto;
