//! Worker output domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::domain::status::QueueStatus;

pub const STATUS_OK: u16 = 200;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// The worker's final report for one job run
///
/// Serialized as JSON, ingested as a text data item, and referenced from the
/// status update sent to the queue. Key names are kept compatible with
/// existing consumers of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerOutput {
    /// Input name -> source URL
    #[serde(rename = "InFiles", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub in_files: BTreeMap<String, String>,

    /// Output file name -> ingested data id
    #[serde(rename = "OutFiles", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub out_files: BTreeMap<String, String>,

    #[serde(rename = "ProgStdOut", default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,

    #[serde(rename = "ProgStdErr", default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,

    #[serde(rename = "Errors", default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    #[serde(rename = "HTTPStatus", default)]
    pub status_code: u16,
}

impl Default for WorkerOutput {
    fn default() -> Self {
        Self {
            in_files: BTreeMap::new(),
            out_files: BTreeMap::new(),
            stdout: String::new(),
            stderr: String::new(),
            errors: Vec::new(),
            status_code: STATUS_OK,
        }
    }
}

impl WorkerOutput {
    /// Records a job-level failure
    pub fn add_error(&mut self, error: impl Display) {
        self.errors.push(error.to_string());
        self.status_code = STATUS_INTERNAL_ERROR;
    }

    pub fn add_errors<E: Display>(&mut self, errors: impl IntoIterator<Item = E>) {
        for error in errors {
            self.add_error(error);
        }
    }

    /// Queue status this output maps to
    pub fn queue_status(&self) -> QueueStatus {
        if self.errors.is_empty() {
            QueueStatus::Success
        } else {
            QueueStatus::Error
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
