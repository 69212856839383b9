// ABOUTME: Phantom-typed identifiers for engine-managed resources.
// ABOUTME: Keeps container and exec identifiers from being swapped at call sites.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use thiserror::Error;

/// Names the resource kind an identifier refers to.
pub trait IdKind {
    const KIND: &'static str;
}

pub enum ContainerMarker {}
pub enum ExecMarker {}

impl IdKind for ContainerMarker {
    const KIND: &'static str = "container";
}

impl IdKind for ExecMarker {
    const KIND: &'static str = "exec";
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("{0} identifier cannot be blank")]
    Blank(&'static str),
}

/// An engine identifier: either an opaque ID or a name, never parsed further.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdKind> Id<T> {
    /// Accept any non-blank value; surrounding whitespace is trimmed.
    pub fn parse(value: &str) -> Result<Self, IdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdError::Blank(T::KIND));
        }
        Ok(Self::new(trimmed.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        T::KIND
    }
}

impl<T> Id<T> {
    pub fn new(value: String) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

// T is a marker only, so none of these impls may require bounds on it.

impl<T: IdKind> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Id({})", T::KIND, self.value)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T: IdKind> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

pub type ContainerId = Id<ContainerMarker>;
pub type ExecId = Id<ExecMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        let id = ContainerId::parse("  web-1 ").unwrap();
        assert_eq!(id.as_str(), "web-1");
    }

    #[test]
    fn parse_rejects_blank() {
        assert_eq!(ContainerId::parse("   "), Err(IdError::Blank("container")));
        assert_eq!(ExecId::parse(""), Err(IdError::Blank("exec")));
    }

    #[test]
    fn debug_names_the_kind() {
        let id = ContainerId::new("abc".to_string());
        assert_eq!(format!("{:?}", id), "containerId(abc)");
    }

    #[test]
    fn deserialize_validates() {
        let ok: ContainerId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(ok.as_str(), "abc");
        assert!(serde_json::from_str::<ContainerId>("\" \"").is_err());
    }
}
