//! Relay HTTP Clients
//!
//! Typed async clients for the three remote collaborators of the relay:
//!
//! - [`QueueClient`]: the job queue (poll jobs, report status, ingest data,
//!   discover services, download inputs)
//! - [`PlatformClient`]: the task execution platform (login, validity probe,
//!   running-task count, task creation)
//! - [`StorageClient`]: the cloud-storage size probe used for resource sizing
//!
//! All of them share one error taxonomy, [`ClientError`], which knows how to
//! classify authentication and memory-limit failures.
//!
//! # Example
//!
//! ```no_run
//! use relay_client::QueueClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relay_client::ClientError> {
//!     let client = QueueClient::new("http://localhost:8080", Some("api-key".to_string()));
//!
//!     let job = client.poll_task("service-id").await?;
//!     if !job.is_empty() {
//!         println!("Got job {}", job.job_id);
//!     }
//!     Ok(())
//! }
//! ```

mod download;
pub mod error;
mod ingest;
pub mod platform;
mod queue;
pub mod storage;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use platform::{PlatformClient, PlatformCredentials};
pub use storage::StorageClient;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_INGEST_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_INGEST_MAX_POLLS: u32 = 300;

/// HTTP client for the job queue API
///
/// Every request carries the queue's API key as HTTP basic auth with an
/// empty password.
#[derive(Debug, Clone)]
pub struct QueueClient {
    /// Base URL of the queue (e.g., "http://localhost:8080")
    base_url: String,
    api_key: Option<String>,
    client: Client,
    ingest_poll_interval: Duration,
    ingest_max_polls: u32,
}

impl QueueClient {
    /// Create a new queue client
    ///
    /// # Example
    /// ```
    /// use relay_client::QueueClient;
    ///
    /// let client = QueueClient::new("http://localhost:8080", None);
    /// ```
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(base_url, api_key, Client::new())
    }

    /// Create a new queue client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, api_key: Option<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
            ingest_poll_interval: DEFAULT_INGEST_POLL_INTERVAL,
            ingest_max_polls: DEFAULT_INGEST_MAX_POLLS,
        }
    }

    /// Override how ingest jobs are awaited
    pub fn with_ingest_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.ingest_poll_interval = interval;
        self.ingest_max_polls = max_polls.max(1);
        self
    }

    /// Get the base URL of the queue
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request against the queue with authentication attached
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.basic_auth(key, Some("")),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}
