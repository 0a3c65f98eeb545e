//! Job status reported back to the queue

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status values understood by the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    Success,
    Fail,
    Error,
    Running,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueueStatus::Success => "Success",
            QueueStatus::Fail => "Fail",
            QueueStatus::Error => "Error",
            QueueStatus::Running => "Running",
        };
        f.write_str(s)
    }
}

/// Body of `POST /service/{serviceId}/task/{jobId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: QueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StatusResult>,
}

/// Points the queue at an ingested data item holding the job's output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "dataId")]
    pub data_id: String,
}

impl StatusUpdate {
    /// A report with no attached data
    pub fn no_data(status: QueueStatus) -> Self {
        Self {
            status,
            result: None,
        }
    }

    /// A report pointing at an ingested data item
    pub fn with_data(status: QueueStatus, data_id: impl Into<String>) -> Self {
        Self {
            status,
            result: Some(StatusResult {
                kind: "data".to_string(),
                data_id: data_id.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_data_omits_result() {
        let body = serde_json::to_value(StatusUpdate::no_data(QueueStatus::Fail)).unwrap();
        assert_eq!(body, json!({ "status": "Fail" }));
    }

    #[test]
    fn test_with_data_shape() {
        let body =
            serde_json::to_value(StatusUpdate::with_data(QueueStatus::Success, "data-1")).unwrap();
        assert_eq!(
            body,
            json!({ "status": "Success", "result": { "type": "data", "dataId": "data-1" } })
        );
    }
}
