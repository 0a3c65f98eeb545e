//! Job domain types

use serde::{Deserialize, Serialize};

/// Placeholder written over credential fields before a job is logged
pub const REDACTED: &str = "*****";

/// A job pulled from the queue, as handed to the dispatcher
///
/// `content` is the raw JSON job body; it is parsed into a [`JobInput`]
/// once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolledJob {
    pub job_id: String,
    pub content: String,
}

impl PolledJob {
    /// The queue answers with an empty body when there is no work
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Parsed job body
///
/// Input names and URLs are parallel lists; their lengths are validated when
/// the task command is built, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobInput {
    /// Extra arguments appended to the algorithm's configured command
    #[serde(rename = "cmd")]
    pub command: String,

    #[serde(rename = "userID")]
    pub user_id: String,

    #[serde(rename = "inExtFiles")]
    pub input_urls: Vec<String>,

    #[serde(rename = "inExtNames")]
    pub input_names: Vec<String>,

    #[serde(rename = "outGeoJson")]
    pub out_geojson: Vec<String>,

    #[serde(rename = "outTiffs")]
    pub out_tiffs: Vec<String>,

    #[serde(rename = "outTxts")]
    pub out_txts: Vec<String>,

    #[serde(rename = "inExtAuthKey", skip_serializing_if = "String::is_empty")]
    pub ext_auth: String,

    #[serde(rename = "pzAuthKey", skip_serializing_if = "String::is_empty")]
    pub queue_auth: String,
}

impl JobInput {
    /// Parses a job body and redacts its credentials in one step
    ///
    /// Nothing downstream needs the raw credentials, so they never leave
    /// this function unmasked.
    pub fn parse_redacted(content: &str) -> serde_json::Result<Self> {
        let mut input: JobInput = serde_json::from_str(content)?;
        input.redact();
        Ok(input)
    }

    /// Masks every credential-bearing field that is set
    pub fn redact(&mut self) {
        if !self.ext_auth.is_empty() {
            self.ext_auth = REDACTED.to_string();
        }
        if !self.queue_auth.is_empty() {
            self.queue_auth = REDACTED.to_string();
        }
    }

    /// All output file names in submission order: GeoJSON, then TIFF, then text
    pub fn output_names(&self) -> Vec<String> {
        self.out_geojson
            .iter()
            .chain(&self.out_tiffs)
            .chain(&self.out_txts)
            .cloned()
            .collect()
    }

    /// JSON form of the job for audit logs
    pub fn to_audit_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
