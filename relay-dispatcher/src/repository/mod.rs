//! Repository layer
//!
//! Narrow, trait-based views of the job queue and the storage size probe,
//! so the poll loop can be exercised against in-memory fakes.

use async_trait::async_trait;
use relay_client::{QueueClient, Result as ClientResult, StorageClient};
use relay_core::domain::job::PolledJob;
use relay_core::domain::status::QueueStatus;

/// The job queue as seen by the dispatcher
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Pulls the next job; an empty job means nothing is pending
    async fn poll_task(&self, service_id: &str) -> ClientResult<PolledJob>;

    /// Reports a status with no attached data
    async fn send_status(
        &self,
        service_id: &str,
        job_id: &str,
        status: QueueStatus,
    ) -> ClientResult<()>;
}

/// Object size lookup used to size task containers
#[async_trait]
pub trait SizeProbe: Send + Sync {
    /// Size in megabytes; unsupported URLs are an error
    async fn size_mb(&self, url: &str) -> ClientResult<u64>;
}

#[async_trait]
impl JobQueue for QueueClient {
    async fn poll_task(&self, service_id: &str) -> ClientResult<PolledJob> {
        QueueClient::poll_task(self, service_id).await
    }

    async fn send_status(
        &self,
        service_id: &str,
        job_id: &str,
        status: QueueStatus,
    ) -> ClientResult<()> {
        QueueClient::send_status(self, service_id, job_id, status).await
    }
}

#[async_trait]
impl SizeProbe for StorageClient {
    async fn size_mb(&self, url: &str) -> ClientResult<u64> {
        StorageClient::size_mb(self, url).await
    }
}
