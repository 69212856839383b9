// ABOUTME: Errors raised while normalizing raw request fields.
// ABOUTME: Every variant surfaces to callers as an InvalidParameters failure.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    #[error("parameter {0} cannot be blank")]
    Blank(&'static str),

    #[error("invalid parameter {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("parameter {0} does not reference an existing path")]
    PathNotFound(&'static str),

    #[error("request parameters must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

impl ParamError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ParamError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}
