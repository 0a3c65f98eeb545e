//! Output persistence

use anyhow::{Context, Result};
use async_trait::async_trait;
use relay_client::QueueClient;
use relay_core::dto::ingest::DataKind;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Provenance attached to every ingested output of one run
#[derive(Debug, Clone, Default)]
pub struct OutputMeta {
    pub source: String,
    pub version: String,
    pub attributes: BTreeMap<String, String>,
}

#[async_trait]
pub trait OutputIngestor: Send + Sync {
    /// Stores one output file and returns its data id
    async fn ingest(&self, path: &Path, meta: &OutputMeta) -> Result<String>;
}

pub struct QueueIngestor {
    client: QueueClient,
}

impl QueueIngestor {
    pub fn new(client: QueueClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OutputIngestor for QueueIngestor {
    async fn ingest(&self, path: &Path, meta: &OutputMeta) -> Result<String> {
        let kind = DataKind::detect(path);
        let data_id = self
            .client
            .ingest_file(path, kind, &meta.source, &meta.version, meta.attributes.clone())
            .await
            .with_context(|| format!("ingest of {} failed", path.display()))?;

        info!(kind = %kind, data_id = %data_id, "Ingested {}", path.display());
        Ok(data_id)
    }
}
