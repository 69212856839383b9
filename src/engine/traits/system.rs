// ABOUTME: Engine-wide operations trait.
// ABOUTME: Ping, system info, disk usage, and registry login.

use super::super::error::EngineError;
use super::shared_types::RegistryAuth;
use async_trait::async_trait;
use serde_json::Value;

/// Engine metadata and registry session operations.
#[async_trait]
pub trait SystemOps: Send + Sync {
    /// Check that the engine answers.
    async fn ping(&self) -> Result<(), EngineError>;

    /// Engine system information.
    async fn info(&self) -> Result<Value, EngineError>;

    /// Data usage summary for images, containers, and volumes.
    async fn disk_usage(&self) -> Result<Value, EngineError>;

    /// Validate credentials against a registry. The reply never echoes tokens.
    async fn login(&self, auth: &RegistryAuth) -> Result<Value, EngineError>;
}
