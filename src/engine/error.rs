// ABOUTME: Engine-level error types: raw call outcomes and startup connection failures.
// ABOUTME: EngineError keeps the status code so the classifier can map it; ConnectError uses SNAFU.

use snafu::Snafu;
use std::time::Duration;

/// Outcome of a failed engine round trip, before classification.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("engine stream error: {0}")]
    Stream(String),

    #[error("engine transport error: {0}")]
    Transport(String),

    #[error("unexpected engine response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine did not respond within {0:?}")]
    Timeout(Duration),
}

impl EngineError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        EngineError::Server {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_not_modified(&self) -> bool {
        self.status() == Some(304)
    }
}

impl From<bollard::errors::Error> for EngineError {
    fn from(e: bollard::errors::Error) -> Self {
        match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => EngineError::Server {
                status: status_code,
                message,
            },
            bollard::errors::Error::DockerStreamError { error } => EngineError::Stream(error),
            bollard::errors::Error::RequestTimeoutError => EngineError::Timeout(Duration::ZERO),
            bollard::errors::Error::JsonSerdeError { err } => EngineError::Decode(err.to_string()),
            other => EngineError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Decode(e.to_string())
    }
}

/// Failure to establish the engine connection at startup.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConnectError {
    #[snafu(display("invalid engine endpoint '{endpoint}': {reason}"))]
    InvalidEndpoint { endpoint: String, reason: String },

    #[snafu(display("failed to create engine client for {endpoint}: {source}"))]
    Client {
        endpoint: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("engine at {endpoint} did not answer ping: {source}"))]
    Ping {
        endpoint: String,
        source: EngineError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    /// The configured endpoint could not be parsed.
    InvalidEndpoint,
    /// The client could not be built for the endpoint.
    ClientSetup,
    /// The engine was unreachable or refused the ping.
    Unreachable,
}

impl ConnectError {
    pub fn kind(&self) -> ConnectErrorKind {
        match self {
            ConnectError::InvalidEndpoint { .. } => ConnectErrorKind::InvalidEndpoint,
            ConnectError::Client { .. } => ConnectErrorKind::ClientSetup,
            ConnectError::Ping { .. } => ConnectErrorKind::Unreachable,
        }
    }
}
