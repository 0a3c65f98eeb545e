//! Cloud storage size probe
//!
//! Only object URLs on the configured provider host are understood; anything
//! else is reported as unsupported rather than guessed at.

use crate::error::{ClientError, Result};
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;

/// Host fragment identifying supported object-store URLs
pub const DEFAULT_HOST_PATTERN: &str = "amazonaws";

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct StorageClient {
    client: Client,
    host_pattern: String,
}

impl Default for StorageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageClient {
    pub fn new() -> Self {
        Self::with_host_pattern(DEFAULT_HOST_PATTERN)
    }

    pub fn with_host_pattern(pattern: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            host_pattern: pattern.into(),
        }
    }

    /// Whether the URL's host belongs to the supported provider
    pub fn supports(&self, url: &str) -> bool {
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.contains(&self.host_pattern)))
            .unwrap_or(false)
    }

    /// Size of the object behind `url`, in whole megabytes rounded up
    pub async fn size_mb(&self, url: &str) -> Result<u64> {
        if !self.supports(url) {
            return Err(ClientError::InvalidRequest(format!(
                "unsupported storage URL {}",
                url
            )));
        }

        let response = self.client.head(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::api_error(
                status.as_u16(),
                format!("HEAD {} failed", url),
            ));
        }

        // Read the header directly: a HEAD body is always empty
        let bytes = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| ClientError::ParseError(format!("no Content-Length for {}", url)))?;

        Ok(bytes_to_mb(bytes))
    }
}

pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes.div_ceil(BYTES_PER_MB)
}
