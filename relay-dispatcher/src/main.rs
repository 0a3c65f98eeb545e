//! Relay Dispatcher
//!
//! Moves jobs from the job queue onto the task platform.
//!
//! Architecture:
//! - Configuration: service JSON file plus environment, loaded once
//! - Session: cached, probe-validated task platform session
//! - Repositories: job queue and storage size probe behind traits
//! - Scheduler: admission-controlled poll loop, worker command, sizing
//!
//! Each submitted task runs the worker binary, which reports the job's
//! final status to the queue itself.

mod config;
mod repository;
mod scheduler;
mod session;
mod shutdown;
mod vcap;

use anyhow::{Context, Result};
use relay_client::{QueueClient, StorageClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::scheduler::JobPoller;
use crate::session::{PlatformSessionBuilder, SessionFactory};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_dispatcher=info,audit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Relay Dispatcher");

    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Loaded configuration: queue_url={}, target_id={}, task_limit={}",
        config.queue_url, config.target_id, config.task_limit
    );

    if config.service.cli_cmd.trim().is_empty() {
        warn!("CliCmd is blank: workers will run whatever the job's cmd field contains");
    }

    let queue = Arc::new(QueueClient::new(
        config.queue_url.clone(),
        config.api_key.clone(),
    ));

    let service_id = match &config.service_id {
        Some(id) => id.clone(),
        None => discover_service_with_retry(&queue, &config.service.svc_name).await?,
    };
    info!(service_id = %service_id, "Using service");

    let sessions = Arc::new(SessionFactory::new(Arc::new(PlatformSessionBuilder::new(
        config.platform.clone(),
    ))));

    let cancel = shutdown::install_shutdown_handler().context("Failed to install signal handlers")?;

    let poller = JobPoller::new(
        Arc::clone(&config),
        service_id,
        sessions,
        queue,
        Arc::new(StorageClient::new()),
    );

    poller.run(cancel).await;

    info!("Relay Dispatcher stopped");
    Ok(())
}

/// Loads and validates configuration from the environment
fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

/// Resolve the service id by name, retrying with exponential backoff
///
/// The queue may not be reachable yet when the dispatcher starts (common in
/// container environments).
async fn discover_service_with_retry(queue: &QueueClient, name: &str) -> Result<String> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match queue.find_service(name).await {
            Ok(id) => {
                if attempt > 1 {
                    info!("Found service {} after {} attempt(s)", name, attempt);
                }
                return Ok(id);
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Failed to find service {} after {} attempts", name, MAX_RETRIES);
                    return Err(anyhow::anyhow!("Failed to discover service {}: {}", name, e));
                }

                warn!(
                    "Failed to find service {} (attempt {}/{}): {}",
                    name, attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
