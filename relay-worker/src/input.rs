//! Input retrieval

use anyhow::Result;
use async_trait::async_trait;
use relay_client::{ClientError, QueueClient};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[async_trait]
pub trait InputFetcher: Send + Sync {
    /// Downloads `url` to `dest`, returning the number of bytes written
    async fn fetch(&self, url: &str, dest: &Path, cancel: CancellationToken) -> Result<u64>;
}

/// Plain HTTP download with a fixed number of retries
pub struct HttpInputFetcher {
    client: QueueClient,
    retries: u32,
}

impl HttpInputFetcher {
    pub fn new(client: QueueClient, retries: u32) -> Self {
        Self { client, retries }
    }
}

#[async_trait]
impl InputFetcher for HttpInputFetcher {
    async fn fetch(&self, url: &str, dest: &Path, cancel: CancellationToken) -> Result<u64> {
        let mut attempt = 0;
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => anyhow::bail!("download of {} cancelled", url),
                result = self.client.download_to(url, dest) => result,
            };

            match result {
                Ok(bytes) => {
                    info!(url, bytes, "Downloaded input to {}", dest.display());
                    return Ok(bytes);
                }
                // Refusing to overwrite is not transient
                Err(e @ ClientError::InvalidRequest(_)) => return Err(e.into()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(url, attempt, "Download failed, retrying: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
