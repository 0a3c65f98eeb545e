//! Platform-provided application metadata

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct VcapApplication {
    #[serde(default)]
    application_id: String,
}

/// Extracts `application_id` from a `VCAP_APPLICATION` JSON document
pub fn application_id(raw: &str) -> Result<String> {
    let app: VcapApplication =
        serde_json::from_str(raw).context("VCAP_APPLICATION is not valid JSON")?;

    if app.application_id.is_empty() {
        anyhow::bail!("VCAP_APPLICATION has no application_id");
    }

    Ok(app.application_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_id() {
        let raw = r#"{"application_id":"5e8a","application_name":"ndwi","space_id":"s1"}"#;
        assert_eq!(application_id(raw).unwrap(), "5e8a");
    }

    #[test]
    fn test_missing_or_malformed() {
        assert!(application_id(r#"{"name":"ndwi"}"#).is_err());
        assert!(application_id("not json").is_err());
    }
}
