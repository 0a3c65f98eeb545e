//! Relay Worker
//!
//! Runs a single queued job inside its task: fetches the inputs, runs the
//! algorithm, ingests the outputs and reports the job's final status.
//!
//! Exits 0 once a status has been reported, whatever that status is, and 1
//! when the arguments are invalid or the report could not be delivered.

mod cli;
mod config;
mod fanout;
mod ingest;
mod input;
mod pipeline;
mod report;
mod runner;

use clap::Parser;
use relay_client::QueueClient;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::WorkerConfig;
use crate::ingest::QueueIngestor;
use crate::input::HttpInputFetcher;
use crate::pipeline::Worker;
use crate::report::QueueReporter;
use crate::runner::ShellRunner;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match WorkerConfig::from_args(cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.service.cli_cmd.trim().is_empty() {
        warn!("CliCmd is blank: running the job's extra arguments as the whole command");
    }

    let queue = QueueClient::new(config.queue_url.clone(), Some(config.api_key.clone()));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight transfers");
            on_signal.cancel();
        }
    });

    let worker = Worker::new(
        Arc::clone(&config),
        Arc::new(ShellRunner::new(config.working_dir.clone())),
        Arc::new(HttpInputFetcher::new(queue.clone(), config.timeouts.http_retries)),
        Arc::new(QueueIngestor::new(queue.clone())),
        Arc::new(QueueReporter::new(queue, config.service_id.clone())),
        cancel,
    );

    match worker.execute().await {
        Ok(run) => {
            info!(status = %run.update.status, "Worker done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
