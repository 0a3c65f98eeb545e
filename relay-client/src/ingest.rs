//! Data ingest endpoints
//!
//! Ingest is a two step affair: upload the item, which creates a queue-side
//! job, then poll that job until it yields a data id.

use crate::QueueClient;
use crate::error::{ClientError, Result};
use relay_core::dto::ingest::{DataKind, IngestProgress, IngestRequest, JobCreated, JobStatusResponse};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

impl QueueClient {
    /// Ingest a local file and return the resulting data id
    ///
    /// Empty files are rejected before anything is sent.
    pub async fn ingest_file(
        &self,
        path: &Path,
        kind: DataKind,
        source: &str,
        version: &str,
        attributes: BTreeMap<String, String>,
    ) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::InvalidRequest(format!("no file name in {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ClientError::InvalidRequest(format!("cannot read {}: {}", path.display(), e))
        })?;

        self.ingest_bytes(&name, kind, bytes, source, version, attributes)
            .await
    }

    /// Ingest an in-memory payload and return the resulting data id
    pub async fn ingest_bytes(
        &self,
        name: &str,
        kind: DataKind,
        bytes: Vec<u8>,
        source: &str,
        version: &str,
        attributes: BTreeMap<String, String>,
    ) -> Result<String> {
        if bytes.is_empty() {
            return Err(ClientError::InvalidRequest(format!("{} is empty", name)));
        }

        // Text that is not valid UTF-8 cannot travel inline, so it goes up as a file
        let (inline, bytes) = if kind.is_inline() {
            match String::from_utf8(bytes) {
                Ok(content) => (Some(content), Vec::new()),
                Err(e) => {
                    debug!(name, "Not valid UTF-8, uploading as a file");
                    (None, e.into_bytes())
                }
            }
        } else {
            (None, bytes)
        };

        let response = match inline {
            Some(content) => {
                let request =
                    IngestRequest::new(name, kind, source, version, attributes, Some(content));

                self.request(Method::POST, &self.url("/data"))
                    .json(&request)
                    .send()
                    .await?
            }
            None => {
                let request = IngestRequest::new(name, kind, source, version, attributes, None);
                let data = serde_json::to_string(&request).map_err(|e| {
                    ClientError::InternalError(format!("cannot encode ingest request: {}", e))
                })?;
                let form = Form::new()
                    .text("data", data)
                    .part("file", Part::bytes(bytes).file_name(name.to_string()));

                self.request(Method::POST, &self.url("/data/file"))
                    .multipart(form)
                    .send()
                    .await?
            }
        };

        let created: JobCreated = self.handle_response(response).await?;
        if created.data.job_id.is_empty() {
            return Err(ClientError::ParseError(
                "ingest response carried no job id".to_string(),
            ));
        }

        debug!(name, ingest_job_id = %created.data.job_id, "Ingest submitted");
        self.wait_for_ingest(&created.data.job_id).await
    }

    /// Poll an ingest job until it produces a data id
    async fn wait_for_ingest(&self, job_id: &str) -> Result<String> {
        let url = self.url(&format!("/job/{}", job_id));

        for attempt in 1..=self.ingest_max_polls {
            let response = self.request(Method::GET, &url).send().await?;
            let status: JobStatusResponse = self.handle_response(response).await?;

            match status.data.progress() {
                IngestProgress::Done(data_id) => return Ok(data_id),
                IngestProgress::Failed(message) => {
                    return Err(ClientError::JobFailed {
                        job_id: job_id.to_string(),
                        message,
                    });
                }
                IngestProgress::Pending => {
                    if attempt < self.ingest_max_polls {
                        tokio::time::sleep(self.ingest_poll_interval).await;
                    }
                }
            }
        }

        Err(ClientError::JobFailed {
            job_id: job_id.to_string(),
            message: format!("no result after {} polls", self.ingest_max_polls),
        })
    }
}
