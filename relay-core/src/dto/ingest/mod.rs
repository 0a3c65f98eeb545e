//! Data ingest DTOs
//!
//! Ingest is asynchronous on the queue side: the upload returns a job id,
//! and the resulting data id is read from the job status once it succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// How the queue should store an ingested file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Text,
    Geojson,
    Raster,
}

impl DataKind {
    /// Picks a kind from the file extension
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("geojson") => DataKind::Geojson,
            Some("tif") | Some("tiff") | Some("geotiff") => DataKind::Raster,
            _ => DataKind::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Text => "text",
            DataKind::Geojson => "geojson",
            DataKind::Raster => "raster",
        }
    }

    /// Text is sent inline; everything else is uploaded as a file part
    pub fn is_inline(&self) -> bool {
        matches!(self, DataKind::Text)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /data` and the `data` part of `POST /data/file`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub host: bool,
    pub data: DataDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDescriptor {
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    pub metadata: ResourceMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataType {
    #[serde(rename = "type")]
    pub kind: DataKind,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub name: String,
    pub format: String,
    #[serde(rename = "classType")]
    pub class_type: ClassType,
    pub version: String,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassType {
    pub classification: String,
}

impl IngestRequest {
    /// Builds an ingest request
    ///
    /// `content` is only embedded for inline (text) kinds; file kinds carry
    /// their bytes in a separate multipart part.
    pub fn new(
        name: &str,
        kind: DataKind,
        source: &str,
        version: &str,
        attributes: BTreeMap<String, String>,
        content: Option<String>,
    ) -> Self {
        let mime_type = match kind {
            DataKind::Text => Some("application/text".to_string()),
            DataKind::Geojson => Some("application/vnd.geo+json".to_string()),
            DataKind::Raster => None,
        };

        Self {
            kind: "ingest".to_string(),
            host: true,
            data: DataDescriptor {
                data_type: DataType {
                    kind,
                    mime_type,
                    content: if kind.is_inline() { content } else { None },
                },
                metadata: ResourceMetadata {
                    name: name.to_string(),
                    format: kind.to_string(),
                    class_type: ClassType {
                        classification: "UNCLASSIFIED".to_string(),
                    },
                    version: version.to_string(),
                    description: format!("{} uploaded by {}.", kind, source),
                    metadata: attributes,
                },
            },
        }
    }
}

/// Metadata attributes attached to every ingested algorithm output
pub fn algorithm_attributes(
    name: &str,
    version: &str,
    command: &str,
    proc_time: DateTime<Utc>,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("algoName".to_string(), name.to_string()),
        ("algoVersion".to_string(), version.to_string()),
        ("algoCmd".to_string(), command.to_string()),
        (
            "algoProcTime".to_string(),
            proc_time.format("%Y%m%d.%H%M%S.%6f").to_string(),
        ),
    ])
}

/// Response of any job-creating call (`{"data":{"jobId":...}}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobCreated {
    pub data: JobCreatedData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobCreatedData {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

/// Response of `GET /job/{jobId}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStatusResponse {
    pub data: JobStatusData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStatusData {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResultData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobResultData {
    #[serde(rename = "dataId")]
    pub data_id: String,
    pub message: String,
}

/// What a caller polling an ingest job should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestProgress {
    Pending,
    Done(String),
    Failed(String),
}

impl JobStatusData {
    pub fn progress(&self) -> IngestProgress {
        let message = self
            .result
            .as_ref()
            .map(|r| r.message.as_str())
            .unwrap_or_default();

        match self.status.as_str() {
            "Submitted" | "Running" | "Pending" => IngestProgress::Pending,
            "Success" => match &self.result {
                Some(result) if !result.data_id.is_empty() => {
                    IngestProgress::Done(result.data_id.clone())
                }
                _ => IngestProgress::Pending,
            },
            // The job record may not be visible yet right after creation
            "Error" if message == "Job Not Found." => IngestProgress::Pending,
            "Fail" => IngestProgress::Failed(format!("ingest job failed: {}", message)),
            "Error" => IngestProgress::Failed(format!("ingest job errored: {}", message)),
            other => IngestProgress::Failed(format!("unknown ingest job status \"{}\"", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: &str, data_id: Option<&str>, message: &str) -> JobStatusData {
        JobStatusData {
            job_id: "ingest-1".to_string(),
            status: status.to_string(),
            result: data_id.map(|id| JobResultData {
                data_id: id.to_string(),
                message: message.to_string(),
            }),
        }
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(DataKind::detect(Path::new("out/shore.GeoJSON")), DataKind::Geojson);
        assert_eq!(DataKind::detect(Path::new("scene.tif")), DataKind::Raster);
        assert_eq!(DataKind::detect(Path::new("scene.geotiff")), DataKind::Raster);
        assert_eq!(DataKind::detect(Path::new("notes.txt")), DataKind::Text);
        assert_eq!(DataKind::detect(Path::new("no_extension")), DataKind::Text);
    }

    #[test]
    fn test_progress() {
        assert_eq!(status("Running", None, "").progress(), IngestProgress::Pending);
        assert_eq!(status("Success", None, "").progress(), IngestProgress::Pending);
        assert_eq!(
            status("Success", Some("data-9"), "").progress(),
            IngestProgress::Done("data-9".to_string())
        );
        assert_eq!(
            status("Error", Some(""), "Job Not Found.").progress(),
            IngestProgress::Pending
        );
        assert!(matches!(
            status("Fail", Some(""), "disk full").progress(),
            IngestProgress::Failed(msg) if msg.contains("disk full")
        ));
        assert!(matches!(
            status("Weird", None, "").progress(),
            IngestProgress::Failed(_)
        ));
    }

    #[test]
    fn test_file_kinds_do_not_embed_content() {
        let req = IngestRequest::new(
            "scene.tif",
            DataKind::Raster,
            "ndwi",
            "1.0",
            BTreeMap::new(),
            Some("ignored".to_string()),
        );
        assert!(req.data.data_type.content.is_none());
        assert_eq!(req.data.metadata.description, "raster uploaded by ndwi.");
    }

    #[test]
    fn test_algorithm_attributes() {
        let at = DateTime::parse_from_rfc3339("2024-03-05T07:08:09.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let attrs = algorithm_attributes("ndwi", "1.2", "ndwi -f a.tif", at);

        assert_eq!(attrs["algoName"], "ndwi");
        assert_eq!(attrs["algoVersion"], "1.2");
        assert_eq!(attrs["algoCmd"], "ndwi -f a.tif");
        assert_eq!(attrs["algoProcTime"], "20240305.070809.123456");
    }
}
