// ABOUTME: Application-wide error types for berth startup and configuration.
// ABOUTME: Per-request failures use outcome::Failure instead.

use crate::engine::{ConnectError, ConnectErrorKind};
use crate::outcome::Failure;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine could not be reached at startup. Fatal.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(#[from] ConnectError),

    #[error("engine request failed: {0}")]
    Request(#[from] Failure),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// The connection failure kind, when this is `EngineUnavailable`.
    pub fn connect_kind(&self) -> Option<ConnectErrorKind> {
        match self {
            Error::EngineUnavailable(e) => Some(e.kind()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
