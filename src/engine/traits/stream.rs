// ABOUTME: Output-producing container operations.
// ABOUTME: Exec, bounded log reads, and non-following attach.

use super::super::error::EngineError;
use super::shared_types::{EngineStream, ExecOutput, OutputChunk};
use crate::types::ContainerId;
use async_trait::async_trait;

#[async_trait]
pub trait StreamOps: Send + Sync {
    /// Run `cmd` in the container and wait for it to finish.
    async fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput, EngineError>;

    /// The newest `tail` lines of output, without following.
    fn logs(&self, id: &ContainerId, tail: usize) -> EngineStream<OutputChunk>;

    /// Output captured so far through an attach, without following.
    async fn attach(&self, id: &ContainerId) -> Result<EngineStream<OutputChunk>, EngineError>;
}
