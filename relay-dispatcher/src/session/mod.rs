//! Task platform sessions
//!
//! The poll loop never talks to the platform client directly: it asks the
//! [`SessionFactory`] for a session that has just been checked for validity.

mod factory;
mod platform;

pub use factory::SessionFactory;
pub use platform::PlatformSessionBuilder;

use async_trait::async_trait;
use relay_client::Result as ClientResult;
use relay_core::domain::task::TaskRequest;
use std::sync::Arc;

/// A credentialed handle to the task platform
#[async_trait]
pub trait PlatformSession: Send + Sync {
    /// Cheap read-only call used to check that the session still works
    async fn probe(&self) -> ClientResult<()>;

    /// Number of tasks currently running against a target
    async fn count_running_tasks(&self, target_id: &str) -> ClientResult<u64>;

    /// Submits a task and returns the platform's id for it
    async fn create_task(&self, task: &TaskRequest) -> ClientResult<String>;
}

/// Builds fresh sessions, typically by logging in
#[async_trait]
pub trait SessionBuilder: Send + Sync {
    async fn build(&self) -> ClientResult<Arc<dyn PlatformSession>>;
}
