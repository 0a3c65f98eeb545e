//! Plain file download

use crate::QueueClient;
use crate::error::{ClientError, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

impl QueueClient {
    /// Download a URL into a new local file and return the bytes written
    ///
    /// Refuses to overwrite an existing file. A partially written file is
    /// removed so a later attempt can start clean.
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<u64> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ClientError::InvalidRequest(format!(
                "refusing to overwrite existing file {}",
                path.display()
            )));
        }

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| {
                ClientError::InvalidRequest(format!("cannot create {}: {}", path.display(), e))
            })?;

        let mut written: u64 = 0;
        let copied: Result<()> = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await.map_err(|e| {
                    ClientError::InternalError(format!("write to {} failed: {}", path.display(), e))
                })?;
                written += chunk.len() as u64;
            }
            file.flush()
                .await
                .map_err(|e| ClientError::InternalError(format!("flush failed: {}", e)))
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(e);
        }

        debug!(url, bytes = written, "Downloaded {}", path.display());
        Ok(written)
    }
}
