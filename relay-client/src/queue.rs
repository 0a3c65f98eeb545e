//! Job queue task endpoints

use crate::QueueClient;
use crate::error::{ClientError, Result};
use relay_core::domain::job::PolledJob;
use relay_core::domain::status::{QueueStatus, StatusUpdate};
use relay_core::dto::ingest::DataKind;
use relay_core::dto::queue::TaskEnvelope;
use relay_core::dto::service::ServiceList;
use reqwest::Method;
use std::collections::BTreeMap;
use tracing::{debug, warn};

impl QueueClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Pull the next job for a service
    ///
    /// The queue answers with an empty envelope when nothing is pending, so
    /// callers should check [`PolledJob::is_empty`].
    pub async fn poll_task(&self, service_id: &str) -> Result<PolledJob> {
        let url = self.url(&format!("/service/{}/task", service_id));
        let response = self.request(Method::POST, &url).send().await?;

        let envelope: TaskEnvelope = self.handle_response(response).await?;
        Ok(envelope.into_job())
    }

    /// Report a status with no attached data
    pub async fn send_status(
        &self,
        service_id: &str,
        job_id: &str,
        status: QueueStatus,
    ) -> Result<()> {
        self.post_status(service_id, job_id, &StatusUpdate::no_data(status))
            .await
    }

    /// Report a status pointing at freshly ingested result data
    ///
    /// The payload is ingested as a text item first. If that fails the job
    /// cannot point at its output, so the report is downgraded to `Fail`
    /// with no result. Returns the update that was actually sent.
    pub async fn send_status_with_data(
        &self,
        service_id: &str,
        job_id: &str,
        status: QueueStatus,
        payload: Vec<u8>,
    ) -> Result<StatusUpdate> {
        let name = format!("{}.json", job_id);
        let update = match self
            .ingest_bytes(&name, DataKind::Text, payload, service_id, "", BTreeMap::new())
            .await
        {
            Ok(data_id) => StatusUpdate::with_data(status, data_id),
            Err(e) => {
                warn!(job_id, "Failed to ingest job result, reporting failure: {}", e);
                StatusUpdate::no_data(QueueStatus::Fail)
            }
        };

        self.post_status(service_id, job_id, &update).await?;
        Ok(update)
    }

    async fn post_status(&self, service_id: &str, job_id: &str, update: &StatusUpdate) -> Result<()> {
        debug!(job_id, status = %update.status, "Sending status");

        let url = self.url(&format!("/service/{}/task/{}", service_id, job_id));
        let response = self.request(Method::POST, &url).json(update).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Service Registry
    // =============================================================================

    /// Find the id of the service registered under exactly this name
    pub async fn find_service(&self, name: &str) -> Result<String> {
        let url = self.url("/service");
        let response = self
            .request(Method::GET, &url)
            .query(&[("keyword", name), ("perPage", "1000")])
            .send()
            .await?;

        let services: ServiceList = self.handle_response(response).await?;
        services
            .find_by_name(name)
            .map(str::to_string)
            .ok_or_else(|| ClientError::NotFound(format!("service \"{}\"", name)))
    }
}
