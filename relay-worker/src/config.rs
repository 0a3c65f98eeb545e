//! Worker configuration
//!
//! Built once from the command line, the service JSON file and a handful of
//! environment tunables, then shared read-only with every pipeline stage.

use anyhow::{Context, Result};
use relay_core::config::ServiceConfig;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;

/// One `name:url` input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    /// File name the input is stored under in the working directory
    pub name: String,
    pub url: String,
}

impl InputSource {
    /// Splits on the first `:` so the URL keeps its own colons
    pub fn parse(raw: &str) -> Result<Self> {
        let (name, url) = raw
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Invalid input source string: {}", raw))?;

        if name.is_empty() || url.is_empty() {
            anyhow::bail!("Invalid input source string: {}", raw);
        }
        ensure_plain_file_name("Input", name)?;

        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
        })
    }
}

/// Per-stage time limits and retry counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Limit for each input download, retries included
    pub fetch: Duration,
    /// Limit for each output ingest, polling included
    pub ingest: Duration,
    /// Extra download attempts after a failure
    pub http_retries: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(180),
            ingest: Duration::from_secs(180),
            http_retries: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub service: ServiceConfig,
    pub queue_url: String,
    pub api_key: String,
    pub service_id: String,
    pub user_id: String,
    pub job_id: String,
    pub cli_extra: String,
    pub inputs: Vec<InputSource>,
    pub outputs: Vec<String>,
    pub working_dir: PathBuf,
    pub timeouts: Timeouts,
}

impl WorkerConfig {
    /// Creates configuration from parsed arguments and the process environment
    pub fn from_args(cli: Cli) -> Result<Self> {
        Self::from_lookup(cli, |key| std::env::var(key).ok())
    }

    /// Creates configuration from parsed arguments and a variable lookup
    ///
    /// Expected variables:
    /// - the ones named by `PzAddrEnVar` / `APIKeyEnVar` unless given as flags
    /// - FETCH_TIMEOUT, INGEST_TIMEOUT (optional, seconds, default: 180)
    /// - HTTP_RETRIES (optional, default: 1)
    pub fn from_lookup<F>(cli: Cli, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(&cli.config)
            .with_context(|| format!("Failed to read config file {}", cli.config.display()))?;
        let service = ServiceConfig::from_json(&content)
            .with_context(|| format!("Malformed config file {}", cli.config.display()))?;

        let queue_url = cli
            .queue_url
            .filter(|u| !u.is_empty())
            .or_else(|| service.queue_address(&lookup))
            .ok_or_else(|| anyhow::anyhow!("Queue URL is required: pass --queueURL or set PzAddr"))?;
        let api_key = cli
            .api_key
            .filter(|k| !k.is_empty())
            .or_else(|| service.api_key(&lookup))
            .ok_or_else(|| anyhow::anyhow!("API key is required: pass --apiKey or set APIKeyEnVar"))?;

        let inputs = cli
            .inputs
            .iter()
            .map(|raw| InputSource::parse(raw))
            .collect::<Result<Vec<_>>>()?;

        let defaults = Timeouts::default();
        let timeouts = Timeouts {
            fetch: seconds(&lookup, "FETCH_TIMEOUT")?.unwrap_or(defaults.fetch),
            ingest: seconds(&lookup, "INGEST_TIMEOUT")?.unwrap_or(defaults.ingest),
            http_retries: match lookup("HTTP_RETRIES") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("HTTP_RETRIES must be a number, got {:?}", raw))?,
                None => defaults.http_retries,
            },
        };

        let config = Self {
            service,
            queue_url,
            api_key,
            service_id: cli.service_id,
            user_id: cli.user_id,
            job_id: cli.job_id,
            cli_extra: cli.cli_extra,
            inputs,
            outputs: cli.outputs,
            working_dir: cli.work_dir,
            timeouts,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service_id.is_empty() {
            anyhow::bail!("serviceID is required");
        }
        if self.job_id.is_empty() {
            anyhow::bail!("jobID is required to report a result");
        }
        if self.outputs.is_empty() {
            anyhow::bail!("at least one output is required");
        }
        if self.outputs.iter().any(|o| o.trim().is_empty()) {
            anyhow::bail!("output names cannot be empty");
        }
        for output in &self.outputs {
            ensure_plain_file_name("Output", output)?;
        }
        // Results are keyed by name, so a repeated name would hide an item
        ensure_unique("input", self.inputs.iter().map(|i| i.name.as_str()))?;
        ensure_unique("output", self.outputs.iter().map(String::as_str))?;
        if self.timeouts.fetch.is_zero() || self.timeouts.ingest.is_zero() {
            anyhow::bail!("FETCH_TIMEOUT and INGEST_TIMEOUT must be greater than 0");
        }
        Ok(())
    }

    /// Name reported as the source of ingested outputs
    pub fn source_name(&self) -> &str {
        if self.service.svc_name.is_empty() {
            &self.service_id
        } else {
            &self.service.svc_name
        }
    }
}

/// Names are joined onto the working directory and must stay inside it
fn ensure_plain_file_name(what: &str, name: &str) -> Result<()> {
    let path = Path::new(name);
    let plain = !name.contains('/')
        && !name.contains('\\')
        && name != "."
        && name != ".."
        && !path.is_absolute();
    if !plain {
        anyhow::bail!("{} name must be a plain file name: {}", what, name);
    }
    Ok(())
}

fn ensure_unique<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            anyhow::bail!("duplicate {} name: {}", what, name);
        }
    }
    Ok(())
}

fn seconds<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("{} must be a number of seconds, got {:?}", key, raw))
        })
        .transpose()
}
