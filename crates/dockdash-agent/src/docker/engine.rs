//! Container engine seam
//!
//! Everything above this module talks to the engine through
//! [`ContainerEngine`], so the replacement logic runs unchanged against the
//! bollard client or the in-memory engine used in tests.

use super::container::ContainerSummary;
use super::stats::{ContainerStats, PruneReport};
use async_trait::async_trait;
use dockdash_core::network::EndpointRequest;
use dockdash_core::{ContainerDescriptor, CreationSpec};
use thiserror::Error;

/// Engine call failure, classified by what the caller can do about it
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Container engine unavailable: {0}")]
    Unavailable(String),

    #[error("Container engine error: {0}")]
    Api(String),

    #[error("Unexpected engine response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<dockdash_core::Error> for EngineError {
    fn from(err: dockdash_core::Error) -> Self {
        EngineError::InvalidResponse(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Operations the agent needs from a Docker-compatible engine
///
/// `container` arguments accept a name or an ID.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    async fn inspect_container(&self, container: &str) -> Result<ContainerDescriptor>;

    async fn rename_container(&self, container: &str, new_name: &str) -> Result<()>;

    /// Starting a running container succeeds
    async fn start_container(&self, container: &str) -> Result<()>;

    /// Stopping a stopped container succeeds
    async fn stop_container(&self, container: &str, timeout_secs: i64) -> Result<()>;

    async fn restart_container(&self, container: &str, timeout_secs: i64) -> Result<()>;

    async fn remove_container(&self, container: &str, force: bool) -> Result<()>;

    /// Create a container from `spec` under `spec.name`, returning its ID
    async fn create_container(&self, spec: &CreationSpec) -> Result<String>;

    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        endpoint: &EndpointRequest,
    ) -> Result<()>;

    /// ID of a local image, `None` if it is not present
    async fn image_id(&self, image: &str) -> Result<Option<String>>;

    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Last `tail` lines of combined stdout/stderr
    async fn logs(&self, container: &str, tail: usize) -> Result<Vec<String>>;

    /// One resource usage sample
    async fn container_stats(&self, container: &str) -> Result<ContainerStats>;

    /// Remove every container that is not running
    async fn prune_containers(&self) -> Result<PruneReport>;
}
