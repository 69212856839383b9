// ABOUTME: Container operations trait for the container engine.
// ABOUTME: Create, start, stop, restart, remove, inspect, list, commit, top, and stats.

use super::super::error::EngineError;
use super::shared_types::CreatedContainer;
use crate::params::{CommitOptions, ContainerCreateOptions};
use crate::types::ContainerId;
use async_trait::async_trait;
use serde_json::Value;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// List containers; stopped ones only when `all` is set.
    async fn list_containers(&self, all: bool) -> Result<Vec<Value>, EngineError>;

    async fn create_container(
        &self,
        options: &ContainerCreateOptions,
    ) -> Result<CreatedContainer, EngineError>;

    async fn start_container(&self, id: &ContainerId) -> Result<(), EngineError>;

    /// Stop with an optional grace period in seconds.
    async fn stop_container(&self, id: &ContainerId, timeout: Option<i64>)
    -> Result<(), EngineError>;

    async fn restart_container(
        &self,
        id: &ContainerId,
        timeout: Option<i64>,
    ) -> Result<(), EngineError>;

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), EngineError>;

    async fn inspect_container(&self, id: &ContainerId) -> Result<Value, EngineError>;

    /// Create an image from a container, returning `{"Id": ...}`.
    async fn commit_container(&self, options: &CommitOptions) -> Result<Value, EngineError>;

    /// Processes running inside the container.
    async fn top_processes(&self, id: &ContainerId) -> Result<Value, EngineError>;

    /// A single resource-usage snapshot.
    async fn stats_snapshot(&self, id: &ContainerId) -> Result<Value, EngineError>;
}
