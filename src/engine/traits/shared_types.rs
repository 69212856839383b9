// ABOUTME: Shared types used across engine trait definitions.
// ABOUTME: RegistryAuth, CreatedContainer, ExecOutput, OutputLine, and the stream alias.

use super::super::error::EngineError;
use crate::types::ContainerId;
use futures::Stream;
use serde::Serialize;
use std::fmt;
use std::pin::Pin;

/// A fallible stream of engine output.
pub type EngineStream<T> = Pin<Box<dyn Stream<Item = Result<T, EngineError>> + Send>>;

/// Registry authentication credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryAuth {
    /// Username.
    pub username: String,
    /// Password or token.
    pub password: String,
    /// Registry server (e.g., "ghcr.io"). `None` means the engine default.
    pub server: Option<String>,
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}

/// Reply to a container create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedContainer {
    #[serde(rename = "Id")]
    pub id: ContainerId,
    #[serde(rename = "Warnings")]
    pub warnings: Vec<String>,
}

/// Collected result of a finished exec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    pub exit_code: Option<i64>,
    pub stdout: String,
    pub stderr: String,
}

/// Which container stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One chunk of container output. Chunks are not line-aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub content: String,
}

impl OutputChunk {
    pub fn stdout(content: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            content: content.into(),
        }
    }

    pub fn stderr(content: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            content: content.into(),
        }
    }
}

/// Arguments for importing a filesystem tarball as an image.
pub struct ImportRequest {
    /// Tarball contents, read lazily as the engine consumes them.
    pub archive: EngineStream<bytes::Bytes>,
    pub repository: String,
    pub tag: Option<String>,
    pub changes: Option<String>,
}

impl fmt::Debug for ImportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportRequest")
            .field("repository", &self.repository)
            .field("tag", &self.tag)
            .field("changes", &self.changes)
            .finish_non_exhaustive()
    }
}
