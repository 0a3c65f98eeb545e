//! Service configuration file
//!
//! The JSON file shared by the dispatcher and the worker. Keys are PascalCase
//! so existing deployment files load unchanged.

use serde::{Deserialize, Serialize};

/// Per-service settings loaded from the JSON config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ServiceConfig {
    /// Algorithm command; job extra arguments are appended to it
    pub cli_cmd: String,

    /// Command whose stdout is the algorithm version
    pub version_cmd: String,

    /// Literal version used when `VersionCmd` is blank
    pub version_str: String,

    /// Job queue base URL
    pub pz_addr: String,

    /// Name of the environment variable overriding `PzAddr`
    pub pz_addr_en_var: String,

    /// Name of the environment variable holding the queue API key
    #[serde(rename = "APIKeyEnVar")]
    pub api_key_en_var: String,

    /// Registered service name, used to discover the service id
    pub svc_name: String,

    /// Echo redacted job bodies as audit log lines
    pub log_audit: bool,
}

impl ServiceConfig {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Queue address: the env var named by `PzAddrEnVar` wins over `PzAddr`
    pub fn queue_address<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.pz_addr_en_var.is_empty() {
            if let Some(addr) = lookup(&self.pz_addr_en_var).filter(|a| !a.is_empty()) {
                return Some(addr);
            }
        }

        if self.pz_addr.is_empty() {
            None
        } else {
            Some(self.pz_addr.clone())
        }
    }

    /// API key read from the env var named by `APIKeyEnVar`
    pub fn api_key<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key_en_var.is_empty() {
            return None;
        }
        lookup(&self.api_key_en_var).filter(|k| !k.is_empty())
    }

    /// The algorithm command with job-specific arguments appended
    pub fn algorithm_command(&self, cli_extra: &str) -> String {
        if cli_extra.is_empty() {
            self.cli_cmd.clone()
        } else {
            format!("{} {}", self.cli_cmd, cli_extra)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"{
        "CliCmd": "python shoreline.py",
        "VersionCmd": "python shoreline.py --version",
        "PzAddr": "https://queue.example.com",
        "PzAddrEnVar": "QUEUE_ADDR",
        "APIKeyEnVar": "QUEUE_KEY",
        "SvcName": "shoreline",
        "LogAudit": true
    }"#;

    #[test]
    fn test_from_json() {
        let config = ServiceConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.cli_cmd, "python shoreline.py");
        assert_eq!(config.api_key_en_var, "QUEUE_KEY");
        assert_eq!(config.svc_name, "shoreline");
        assert!(config.log_audit);
        assert!(config.version_str.is_empty());
    }

    #[test]
    fn test_queue_address_prefers_env() {
        let config = ServiceConfig::from_json(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [("QUEUE_ADDR", "http://override:9000")].into();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        assert_eq!(
            config.queue_address(lookup).as_deref(),
            Some("http://override:9000")
        );
        assert_eq!(
            config.queue_address(|_| None).as_deref(),
            Some("https://queue.example.com")
        );
    }

    #[test]
    fn test_api_key() {
        let config = ServiceConfig::from_json(SAMPLE).unwrap();
        assert_eq!(
            config.api_key(|k| (k == "QUEUE_KEY").then(|| "k-1".to_string())),
            Some("k-1".to_string())
        );
        assert_eq!(ServiceConfig::default().api_key(|_| Some("x".into())), None);
    }

    #[test]
    fn test_algorithm_command() {
        let config = ServiceConfig::from_json(SAMPLE).unwrap();
        assert_eq!(
            config.algorithm_command("-f a.tif"),
            "python shoreline.py -f a.tif"
        );
        assert_eq!(config.algorithm_command(""), "python shoreline.py");
    }
}
