// ABOUTME: Opaque image reference accepted wherever an image is named.
// ABOUTME: Covers both raw IDs and registry/repository/name:tag without parsing them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,
}

/// An image ID or `registry/repository/name:tag` string.
///
/// The structure is left to the engine: the only local rule is that the
/// reference is not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef(String);

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }
        Ok(Self(input.to_string()))
    }

    /// Compose `repo/name`, dropping any redundant separators at the seam.
    pub fn in_repository(repo: &str, name: &str) -> Result<Self, ParseImageRefError> {
        let repo = repo.trim().trim_end_matches('/');
        let name = name.trim().trim_start_matches('/');
        if name.is_empty() {
            return Err(ParseImageRefError::Empty);
        }
        if repo.is_empty() {
            return Self::parse(name);
        }
        Ok(Self(format!("{}/{}", repo, name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ImageRef {
    type Error = ParseImageRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        value.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
