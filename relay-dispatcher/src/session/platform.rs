//! Session implementation backed by the platform HTTP client

use async_trait::async_trait;
use relay_client::{PlatformClient, PlatformCredentials, Result as ClientResult};
use relay_core::domain::task::TaskRequest;
use std::sync::Arc;

use super::{PlatformSession, SessionBuilder};

#[async_trait]
impl PlatformSession for PlatformClient {
    async fn probe(&self) -> ClientResult<()> {
        PlatformClient::probe(self).await
    }

    async fn count_running_tasks(&self, target_id: &str) -> ClientResult<u64> {
        PlatformClient::count_running_tasks(self, target_id).await
    }

    async fn create_task(&self, task: &TaskRequest) -> ClientResult<String> {
        PlatformClient::create_task(self, task)
            .await
            .map(|created| created.guid)
    }
}

/// Logs in with fixed credentials every time a session is needed
pub struct PlatformSessionBuilder {
    credentials: PlatformCredentials,
}

impl PlatformSessionBuilder {
    pub fn new(credentials: PlatformCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl SessionBuilder for PlatformSessionBuilder {
    async fn build(&self) -> ClientResult<Arc<dyn PlatformSession>> {
        let client = PlatformClient::login(&self.credentials).await?;
        Ok(Arc::new(client))
    }
}
