//! Dispatcher configuration
//!
//! Everything is read once at startup into an immutable [`Config`] that is
//! shared by reference with every component; nothing overrides it later.

use anyhow::{Context, Result};
use relay_client::PlatformCredentials;
use relay_core::config::ServiceConfig;
use relay_core::domain::task::ResourceAllocation;
use std::path::PathBuf;
use std::time::Duration;

use crate::vcap;

/// Container sizing constants
///
/// When every input can be sized, `disk = disk_base + disk_factor * total`
/// and `memory = memory_base + memory_factor * total` (all in MB). Otherwise
/// the defaults apply unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingConfig {
    pub default_disk_mb: u64,
    pub default_memory_mb: u64,
    pub disk_base_mb: u64,
    pub memory_base_mb: u64,
    pub disk_factor: u64,
    pub memory_factor: u64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            default_disk_mb: 6142,
            default_memory_mb: 3072,
            disk_base_mb: 2048,
            memory_base_mb: 3072,
            disk_factor: 2,
            memory_factor: 5,
        }
    }
}

impl SizingConfig {
    pub fn defaults(&self) -> ResourceAllocation {
        ResourceAllocation {
            disk_mb: self.default_disk_mb,
            memory_mb: self.default_memory_mb,
        }
    }

    /// Allocation for a known total input size, saturating at `u64::MAX`
    pub fn for_total_mb(&self, total_mb: u64) -> ResourceAllocation {
        ResourceAllocation {
            disk_mb: self
                .disk_base_mb
                .saturating_add(self.disk_factor.saturating_mul(total_mb)),
            memory_mb: self
                .memory_base_mb
                .saturating_add(self.memory_factor.saturating_mul(total_mb)),
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the service JSON config, also handed to every worker
    pub config_path: PathBuf,

    pub service: ServiceConfig,

    /// Job queue base URL
    pub queue_url: String,

    pub api_key: Option<String>,

    /// Known service id; discovered from `SvcName` when absent
    pub service_id: Option<String>,

    /// Application the tasks run against
    pub target_id: String,

    /// Maximum number of concurrently running tasks
    pub task_limit: u64,

    /// How often to check for new work
    pub poll_interval: Duration,

    /// Worker binary invoked by each task
    pub worker_command: String,

    pub platform: PlatformCredentials,

    pub sizing: SizingConfig,
}

impl Config {
    /// Creates configuration from the process environment
    pub fn from_env() -> Result<Self> {
        let arg_path = std::env::args().nth(1);
        Self::from_lookup(|key| std::env::var(key).ok(), arg_path)
    }

    /// Creates configuration from an arbitrary variable lookup
    ///
    /// Expected variables:
    /// - CONFIG_PATH (or the first command line argument)
    /// - SERVICE_ID (optional, discovered from `SvcName` otherwise)
    /// - TASK_LIMIT (optional, default: 3)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - WORKER_COMMAND (optional, default: worker)
    /// - CF_API, CF_USER, CF_PASS (required)
    /// - TASK_TARGET_ID, or VCAP_APPLICATION with an `application_id`
    /// - TASK_DISK_MB, TASK_MEMORY_MB, TASK_DISK_BASE_MB, TASK_MEMORY_BASE_MB,
    ///   TASK_DISK_FACTOR, TASK_MEMORY_FACTOR (optional sizing overrides)
    pub fn from_lookup<F>(lookup: F, arg_path: Option<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = lookup("CONFIG_PATH")
            .or(arg_path)
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("CONFIG_PATH environment variable not set"))?;

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let service = ServiceConfig::from_json(&content)
            .with_context(|| format!("Malformed config file {}", config_path.display()))?;

        let queue_url = service
            .queue_address(&lookup)
            .ok_or_else(|| anyhow::anyhow!("No queue address: set PzAddr or the PzAddrEnVar variable"))?;
        let api_key = service.api_key(&lookup);

        let target_id = match lookup("TASK_TARGET_ID").filter(|s| !s.is_empty()) {
            Some(id) => id,
            None => {
                let raw = lookup("VCAP_APPLICATION").ok_or_else(|| {
                    anyhow::anyhow!("Neither TASK_TARGET_ID nor VCAP_APPLICATION is set")
                })?;
                vcap::application_id(&raw)?
            }
        };

        let platform = PlatformCredentials {
            api_url: required(&lookup, "CF_API")?,
            username: required(&lookup, "CF_USER")?,
            password: required(&lookup, "CF_PASS")?,
        };

        let defaults = SizingConfig::default();
        let sizing = SizingConfig {
            default_disk_mb: number(&lookup, "TASK_DISK_MB")?.unwrap_or(defaults.default_disk_mb),
            default_memory_mb: number(&lookup, "TASK_MEMORY_MB")?
                .unwrap_or(defaults.default_memory_mb),
            disk_base_mb: number(&lookup, "TASK_DISK_BASE_MB")?.unwrap_or(defaults.disk_base_mb),
            memory_base_mb: number(&lookup, "TASK_MEMORY_BASE_MB")?
                .unwrap_or(defaults.memory_base_mb),
            disk_factor: number(&lookup, "TASK_DISK_FACTOR")?.unwrap_or(defaults.disk_factor),
            memory_factor: number(&lookup, "TASK_MEMORY_FACTOR")?
                .unwrap_or(defaults.memory_factor),
        };

        Ok(Self {
            config_path,
            service,
            queue_url,
            api_key,
            service_id: lookup("SERVICE_ID").filter(|s| !s.is_empty()),
            target_id,
            task_limit: number(&lookup, "TASK_LIMIT")?.unwrap_or(3),
            poll_interval: Duration::from_secs(number(&lookup, "POLL_INTERVAL")?.unwrap_or(5)),
            worker_command: lookup("WORKER_COMMAND")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "worker".to_string()),
            platform,
            sizing,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.queue_url.starts_with("http://") && !self.queue_url.starts_with("https://") {
            anyhow::bail!("queue address must start with http:// or https://");
        }

        if self.target_id.is_empty() {
            anyhow::bail!("target id cannot be empty");
        }

        if self.task_limit == 0 {
            anyhow::bail!("TASK_LIMIT must be greater than 0");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("POLL_INTERVAL must be greater than 0");
        }

        if self.service_id.is_none() && self.service.svc_name.is_empty() {
            anyhow::bail!("either SERVICE_ID or SvcName must be set");
        }

        Ok(())
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable not set", key))
}

fn number<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, raw))
        })
        .transpose()
}
