//! Task submission domain types

use serde::{Deserialize, Serialize};

/// Disk and memory to request for a task container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub disk_mb: u64,
    pub memory_mb: u64,
}

/// Materialized request sent to the task platform
///
/// Built by the dispatcher from a parsed job. The command is a full shell
/// command line that invokes the worker binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub command: String,
    /// Task name, set to the queue's job id
    pub name: String,
    /// Application (droplet) the task runs against
    pub target_id: String,
    pub memory_mb: u64,
    pub disk_mb: u64,
}

impl TaskRequest {
    pub fn new(
        command: String,
        name: String,
        target_id: String,
        resources: ResourceAllocation,
    ) -> Self {
        Self {
            command,
            name,
            target_id,
            memory_mb: resources.memory_mb,
            disk_mb: resources.disk_mb,
        }
    }
}
