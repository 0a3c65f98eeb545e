//! In-memory queue state
//!
//! Plays the role the database plays for a real queue: pending jobs, status
//! reports and ingested data, all behind one mutex shared by the handlers.

use chrono::{DateTime, Utc};
use relay_core::domain::job::PolledJob;
use relay_core::domain::status::StatusUpdate;
use relay_core::dto::ingest::DataKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// A status report received from a dispatcher or worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedStatus {
    pub service_id: String,
    pub job_id: String,
    pub update: StatusUpdate,
    pub received_at: DateTime<Utc>,
}

/// A data item received through `/data` or `/data/file`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedIngest {
    pub ingest_job_id: String,
    pub data_id: String,
    pub name: String,
    pub kind: DataKind,
    pub content: Option<String>,
    pub size: usize,
}

#[derive(Debug, Default)]
struct Inner {
    pending: VecDeque<PolledJob>,
    statuses: Vec<RecordedStatus>,
    ingests: Vec<RecordedIngest>,
    ingest_index: HashMap<String, usize>,
}

/// Shared handler state
#[derive(Debug, Clone)]
pub struct MockState {
    service_id: String,
    service_name: String,
    inner: Arc<Mutex<Inner>>,
}

impl MockState {
    pub fn new(service_id: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            service_name: service_name.into(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    // A panicking handler must not take the whole mock down with it
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues job content and returns the job id assigned to it
    pub fn enqueue(&self, job_id: Option<String>, content: impl Into<String>) -> String {
        let job_id = job_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.lock().pending.push_back(PolledJob {
            job_id: job_id.clone(),
            content: content.into(),
        });
        job_id
    }

    /// Pops the oldest pending job
    pub fn next_job(&self) -> Option<PolledJob> {
        self.lock().pending.pop_front()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn record_status(&self, job_id: &str, update: StatusUpdate) {
        self.lock().statuses.push(RecordedStatus {
            service_id: self.service_id.clone(),
            job_id: job_id.to_string(),
            update,
            received_at: Utc::now(),
        });
    }

    pub fn statuses(&self) -> Vec<RecordedStatus> {
        self.lock().statuses.clone()
    }

    /// Stores an ingested item and returns its ingest job id
    ///
    /// Ingest completes immediately: the job is `Success` as soon as it is
    /// visible.
    pub fn record_ingest(
        &self,
        name: String,
        kind: DataKind,
        content: Option<String>,
        size: usize,
    ) -> String {
        let ingest = RecordedIngest {
            ingest_job_id: Uuid::new_v4().to_string(),
            data_id: Uuid::new_v4().to_string(),
            name,
            kind,
            content,
            size,
        };
        let ingest_job_id = ingest.ingest_job_id.clone();

        let mut inner = self.lock();
        let index = inner.ingests.len();
        inner.ingests.push(ingest);
        inner.ingest_index.insert(ingest_job_id.clone(), index);

        ingest_job_id
    }

    /// Data id produced by an ingest job, if the job exists
    pub fn ingest_result(&self, ingest_job_id: &str) -> Option<String> {
        let inner = self.lock();
        inner
            .ingest_index
            .get(ingest_job_id)
            .and_then(|&i| inner.ingests.get(i))
            .map(|ingest| ingest.data_id.clone())
    }

    pub fn ingests(&self) -> Vec<RecordedIngest> {
        self.lock().ingests.clone()
    }

    /// Content of an inline ingest looked up by data id
    pub fn data_content(&self, data_id: &str) -> Option<String> {
        self.lock()
            .ingests
            .iter()
            .find(|ingest| ingest.data_id == data_id)
            .and_then(|ingest| ingest.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::status::QueueStatus;

    #[test]
    fn test_jobs_are_fifo() {
        let state = MockState::new("svc", "algo");
        let first = state.enqueue(None, "{\"cmd\":\"1\"}");
        state.enqueue(Some("J2".to_string()), "{\"cmd\":\"2\"}");

        assert_eq!(state.pending_count(), 2);
        assert_eq!(state.next_job().unwrap().job_id, first);
        assert_eq!(state.next_job().unwrap().job_id, "J2");
        assert!(state.next_job().is_none());
    }

    #[test]
    fn test_ingest_lookup() {
        let state = MockState::new("svc", "algo");
        let job = state.record_ingest(
            "out.txt".to_string(),
            DataKind::Text,
            Some("hello".to_string()),
            5,
        );

        let data_id = state.ingest_result(&job).unwrap();
        assert_eq!(state.data_content(&data_id).as_deref(), Some("hello"));
        assert!(state.ingest_result("missing").is_none());
    }

    #[test]
    fn test_statuses_are_recorded_in_order() {
        let state = MockState::new("svc", "algo");
        state.record_status("J1", StatusUpdate::no_data(QueueStatus::Fail));
        state.record_status("J2", StatusUpdate::with_data(QueueStatus::Success, "d1"));

        let statuses = state.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].job_id, "J1");
        assert_eq!(statuses[1].update.status, QueueStatus::Success);
    }
}
