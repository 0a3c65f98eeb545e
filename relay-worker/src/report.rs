//! Final status report

use anyhow::{Context, Result};
use async_trait::async_trait;
use relay_client::QueueClient;
use relay_core::domain::output::WorkerOutput;
use relay_core::domain::status::StatusUpdate;
use tracing::info;

#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Sends the job's final status and returns the update that was sent
    async fn report(&self, job_id: &str, output: &WorkerOutput) -> Result<StatusUpdate>;
}

/// Reports through the queue: the output is ingested and referenced by data id
pub struct QueueReporter {
    client: QueueClient,
    service_id: String,
}

impl QueueReporter {
    pub fn new(client: QueueClient, service_id: impl Into<String>) -> Self {
        Self {
            client,
            service_id: service_id.into(),
        }
    }
}

#[async_trait]
impl StatusReporter for QueueReporter {
    async fn report(&self, job_id: &str, output: &WorkerOutput) -> Result<StatusUpdate> {
        let payload = output.to_json().context("Failed to serialize worker output")?;
        let update = self
            .client
            .send_status_with_data(&self.service_id, job_id, output.queue_status(), payload)
            .await
            .with_context(|| format!("Failed to send status for job {}", job_id))?;

        info!(job_id, status = %update.status, "Reported job status");
        Ok(update)
    }
}
