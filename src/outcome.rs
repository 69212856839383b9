// ABOUTME: Result classifier mapping engine outcomes onto the stable lifecycle contract.
// ABOUTME: Every failure leaves here as {kind, message} with local paths and credentials redacted.

use crate::engine::EngineError;
use crate::params::ParamError;
use serde::Serialize;
use std::fmt;

/// The fixed set of failure kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    InvalidParameters,
    NotFound,
    EngineRejected,
    #[serde(rename = "IOError")]
    IoError,
    Timeout,
    Internal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::InvalidParameters => "InvalidParameters",
            FailureKind::NotFound => "NotFound",
            FailureKind::EngineRejected => "EngineRejected",
            FailureKind::IoError => "IOError",
            FailureKind::Timeout => "Timeout",
            FailureKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: sanitize(&message.into()),
        }
    }
}

/// Outcome of every gateway operation.
pub type LifecycleResult<T> = Result<T, Failure>;

impl From<ParamError> for Failure {
    fn from(e: ParamError) -> Self {
        Failure::new(FailureKind::InvalidParameters, e.to_string())
    }
}

/// Status codes the engine uses for requests it understood and refused.
const REJECTED_STATUSES: &[u16] = &[400, 401, 403, 406, 409, 412, 422];

/// Map an engine error onto a failure kind.
pub fn classify(error: EngineError) -> Failure {
    let kind = match &error {
        EngineError::Server { status: 404, .. } => FailureKind::NotFound,
        EngineError::Server { status, .. } if REJECTED_STATUSES.contains(status) => {
            FailureKind::EngineRejected
        }
        EngineError::Server { .. } => FailureKind::Internal,
        EngineError::Stream(message) if mentions_not_found(message) => FailureKind::NotFound,
        EngineError::Stream(_) => FailureKind::EngineRejected,
        EngineError::Io(_) => FailureKind::IoError,
        EngineError::Timeout(_) => FailureKind::Timeout,
        EngineError::Transport(_) | EngineError::Decode(_) => FailureKind::Internal,
    };
    let message = match error {
        EngineError::Server { message, .. } => message,
        EngineError::Stream(message) => message,
        other => other.to_string(),
    };
    let failure = Failure::new(kind, message);
    tracing::warn!(kind = %failure.kind, message = %failure.message, "engine call failed");
    failure
}

/// Classify a pull failure. A missing image or repository reads as
/// "Image Not Found".
pub fn classify_pull(error: EngineError) -> Failure {
    let failure = classify(error);
    if failure.kind == FailureKind::NotFound {
        Failure::new(FailureKind::NotFound, "Image Not Found")
    } else {
        failure
    }
}

/// State transitions report "already in that state" as 304; that is success.
pub fn tolerate_not_modified(result: Result<(), EngineError>) -> Result<(), EngineError> {
    match result {
        Err(e) if e.is_not_modified() => Ok(()),
        other => other,
    }
}

fn mentions_not_found(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["not found", "no such", "does not exist", "manifest unknown"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Redact absolute filesystem paths, socket URLs and URL credentials.
pub fn sanitize(message: &str) -> String {
    message
        .split(' ')
        .map(redact_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim_matches(|c: char| matches!(c, '"' | '\'' | ',' | ';' | ':' | '(' | ')'));
    if trimmed.is_empty() {
        return token.to_string();
    }
    let replacement = if trimmed.starts_with("unix://") {
        Some("<socket>".to_string())
    } else if let Some((scheme, rest)) = trimmed.split_once("://")
        && let Some((_, host)) = rest.split_once('@')
    {
        Some(format!("{}://<redacted>@{}", scheme, host))
    } else if is_absolute_path(trimmed) {
        Some("<path>".to_string())
    } else {
        None
    };
    match replacement {
        Some(replacement) => token.replacen(trimmed, &replacement, 1),
        None => token.to_string(),
    }
}

fn is_absolute_path(token: &str) -> bool {
    // A lone "/" or API paths such as "/containers/x" stay; multi-segment
    // filesystem paths are redacted.
    token.starts_with('/')
        && token.len() > 1
        && token[1..].contains('/')
        && !token.starts_with("/v1.")
        && !token.starts_with("/containers/")
        && !token.starts_with("/images/")
}
