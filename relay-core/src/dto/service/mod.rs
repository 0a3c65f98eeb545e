//! Service registry DTOs

use serde::{Deserialize, Serialize};

/// Response of `GET /service`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceList {
    pub data: Vec<ServiceEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEntry {
    #[serde(rename = "serviceId")]
    pub service_id: String,
    #[serde(rename = "resourceMetadata")]
    pub resource_metadata: ServiceMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceMetadata {
    pub name: String,
}

impl ServiceList {
    /// Id of the service whose name matches exactly
    pub fn find_by_name(&self, name: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|entry| entry.resource_metadata.name == name)
            .map(|entry| entry.service_id.as_str())
    }
}
