//! Worker execution pipeline
//!
//! One run moves through four stages, each of which ends the run early on
//! failure:
//!
//! 1. fetch every input concurrently into the working directory
//! 2. determine the algorithm version
//! 3. run the algorithm command
//! 4. ingest every output concurrently
//!
//! Whatever happened, exactly one status report is sent at the end. A run
//! keeps no state between invocations, so re-running a job produces a fresh,
//! independent report.

use anyhow::{Context, Result};
use chrono::Utc;
use relay_core::domain::output::WorkerOutput;
use relay_core::domain::status::StatusUpdate;
use relay_core::dto::ingest::algorithm_attributes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::{InputSource, WorkerConfig};
use crate::fanout::{MultiResult, fan_out};
use crate::ingest::{OutputIngestor, OutputMeta};
use crate::input::InputFetcher;
use crate::report::StatusReporter;
use crate::runner::{CommandError, CommandRunner};

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct WorkerRun {
    pub output: WorkerOutput,
    pub update: StatusUpdate,
}

pub struct Worker {
    config: Arc<WorkerConfig>,
    runner: Arc<dyn CommandRunner>,
    fetcher: Arc<dyn InputFetcher>,
    ingestor: Arc<dyn OutputIngestor>,
    reporter: Arc<dyn StatusReporter>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        config: Arc<WorkerConfig>,
        runner: Arc<dyn CommandRunner>,
        fetcher: Arc<dyn InputFetcher>,
        ingestor: Arc<dyn OutputIngestor>,
        reporter: Arc<dyn StatusReporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            runner,
            fetcher,
            ingestor,
            reporter,
            cancel,
        }
    }

    /// Runs the job and reports its outcome
    ///
    /// Only a failure to deliver the report is returned as an error; job
    /// failures are part of the reported output.
    pub async fn execute(&self) -> Result<WorkerRun> {
        let span = info_span!("job", job_id = %self.config.job_id);

        async {
            info!(user_id = %self.config.user_id, "Starting job");

            let output = self.process().await;
            let update = self
                .reporter
                .report(&self.config.job_id, &output)
                .await
                .context("Failed to report job result")?;

            info!(status = %update.status, errors = output.errors.len(), "Job finished");
            Ok::<_, anyhow::Error>(WorkerRun { output, update })
        }
        .instrument(span)
        .await
    }

    async fn process(&self) -> WorkerOutput {
        let mut output = WorkerOutput::default();

        let fetched = self.fetch_inputs().await;
        if let Some(combined) = fetched.combined_error() {
            error!("Input retrieval failed: {}", combined);
            output.add_errors(fetched.errors());
            return output;
        }
        if !fetched.is_empty() {
            info!(count = fetched.len(), "Inputs fetched");
        }
        output.in_files = fetched.artifacts();

        let version = match self.algorithm_version().await {
            Ok(version) => version,
            Err(e) => {
                error!("Version command failed: {}", e);
                output.stderr = e.stderr().to_string();
                output.add_error(format!("version command: {}", e));
                return output;
            }
        };

        let command = self.config.service.algorithm_command(&self.config.cli_extra);
        match self.runner.run(&command).await {
            Ok(result) => {
                output.stdout = result.stdout;
                output.stderr = result.stderr;
            }
            Err(e) => {
                match &e {
                    CommandError::Exited { .. } => warn!("Algorithm exited unsuccessfully: {}", e),
                    _ => error!("Algorithm could not run: {}", e),
                }
                output.stdout = e.stdout().to_string();
                output.stderr = e.stderr().to_string();
                output.add_error(e);
                return output;
            }
        }

        let ingested = self.ingest_outputs(&command, &version).await;
        if let Some(combined) = ingested.combined_error() {
            error!("Output ingest failed: {}", combined);
            output.add_errors(ingested.errors());
            return output;
        }
        output.out_files = ingested.artifacts();

        output
    }

    /// Downloads each input; the artifact is the source URL
    async fn fetch_inputs(&self) -> MultiResult {
        let items: Vec<(String, InputSource)> = self
            .config
            .inputs
            .iter()
            .map(|source| (source.name.clone(), source.clone()))
            .collect();

        let fetcher = Arc::clone(&self.fetcher);
        let dir = self.config.working_dir.clone();

        fan_out(
            "input",
            items,
            self.config.timeouts.fetch,
            &self.cancel,
            move |source: InputSource, token| {
                let fetcher = Arc::clone(&fetcher);
                let dest = dir.join(&source.name);
                async move {
                    fetcher.fetch(&source.url, &dest, token).await?;
                    Ok(source.url)
                }
            },
        )
        .await
    }

    /// `VersionCmd` output, or `VersionStr` when no command is configured
    async fn algorithm_version(&self) -> Result<String, CommandError> {
        let version_cmd = self.config.service.version_cmd.trim();
        if version_cmd.is_empty() {
            return Ok(self.config.service.version_str.clone());
        }

        let result = self.runner.run(version_cmd).await?;
        Ok(result.stdout.trim().to_string())
    }

    /// Ingests each output; the artifact is the data id
    async fn ingest_outputs(&self, command: &str, version: &str) -> MultiResult {
        let meta = Arc::new(OutputMeta {
            source: self.config.source_name().to_string(),
            version: version.to_string(),
            attributes: algorithm_attributes(
                self.config.source_name(),
                version,
                command,
                Utc::now(),
            ),
        });

        let items: Vec<(String, String)> = self
            .config
            .outputs
            .iter()
            .map(|name| (name.clone(), name.clone()))
            .collect();

        let ingestor = Arc::clone(&self.ingestor);
        let dir = self.config.working_dir.clone();

        fan_out(
            "output",
            items,
            self.config.timeouts.ingest,
            &self.cancel,
            move |name: String, token: CancellationToken| {
                let ingestor = Arc::clone(&ingestor);
                let meta = Arc::clone(&meta);
                let path = dir.join(&name);
                async move {
                    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                        anyhow::bail!("output file {} was not produced", name);
                    }
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => anyhow::bail!("ingest of {} cancelled", name),
                        data_id = ingestor.ingest(&path, &meta) => data_id,
                    }
                }
            },
        )
        .await
    }
}
