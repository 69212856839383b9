// ABOUTME: Loosely-typed request fields as handed over by the request layer.
// ABOUTME: Distinguishes absent fields from explicit values and coerces scalars.

use super::error::ParamError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Every parameter name the request layer may supply.
pub const KNOWN_PARAMETERS: &[&str] = &[
    "login_user",
    "login_pass",
    "registry_srv",
    "keyword",
    "repo_name",
    "image_name",
    "image_tag",
    "image_id",
    "tag_name",
    "force",
    "save_path",
    "tarball_name",
    "changes",
    "all",
    "command",
    "hostname",
    "user",
    "detach",
    "stdin_open",
    "tty",
    "ports",
    "environment",
    "volumes",
    "network_disabled",
    "name",
    "entrypoint",
    "working_dir",
    "domainname",
    "host_config",
    "mac_address",
    "labels",
    "stop_signal",
    "networking_config",
    "healthcheck",
    "stop_timeout",
    "runtime",
    "container_id",
    "message",
    "author",
    "conf",
    "cmd",
];

/// Tri-state boolean flag normalized at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    #[default]
    Unset,
    False,
    True,
}

impl Flag {
    /// Presence turns a flag on; only explicit negative literals turn it off.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Flag::Unset,
            Some(Value::Bool(false)) => Flag::False,
            Some(Value::String(s)) if is_negative_literal(s) => Flag::False,
            Some(_) => Flag::True,
        }
    }

    pub fn resolve(self, default: bool) -> bool {
        match self {
            Flag::Unset => default,
            Flag::False => false,
            Flag::True => true,
        }
    }

    pub fn is_true(self) -> bool {
        self == Flag::True
    }
}

fn is_negative_literal(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no"
    )
}

/// Raw request fields keyed by parameter name.
///
/// A field holding JSON `null` is treated the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParameters {
    fields: Map<String, Value>,
}

impl RawParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object body. `null` yields an empty set; unknown
    /// names are dropped.
    pub fn from_json(value: Value) -> Result<Self, ParamError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => {
                let mut params = Self::new();
                for (name, value) in map {
                    params.insert(name, value);
                }
                Ok(params)
            }
            other => Err(ParamError::NotAnObject(json_type(&other))),
        }
    }

    /// Merge string pairs (query string fields) without overriding existing ones.
    pub fn merge_strings(&mut self, pairs: HashMap<String, String>) {
        for (name, value) in pairs {
            if !self.fields.contains_key(&name) {
                self.insert(name, Value::String(value));
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if !KNOWN_PARAMETERS.contains(&name.as_str()) {
            tracing::debug!(parameter = %name, "ignoring unknown parameter");
            return;
        }
        self.fields.insert(name, value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// The value of a field, treating `null` as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn flag(&self, name: &str) -> Flag {
        Flag::from_value(self.get(name))
    }

    /// A scalar field rendered as a string.
    pub fn string(&self, name: &'static str) -> Result<Option<String>, ParamError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(ParamError::invalid(
                name,
                format!("expected a string, got {}", json_type(other)),
            )),
        }
    }

    pub fn required_string(&self, name: &'static str) -> Result<String, ParamError> {
        self.string(name)?.ok_or(ParamError::Missing(name))
    }

    /// A string field where whitespace-only input means "unset".
    pub fn non_blank(&self, name: &'static str) -> Result<Option<String>, ParamError> {
        Ok(self
            .string(name)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    /// Like [`non_blank`](Self::non_blank) but the field must carry content.
    pub fn required_non_blank(&self, name: &'static str) -> Result<String, ParamError> {
        match self.get(name) {
            None => Err(ParamError::Missing(name)),
            Some(_) => self.non_blank(name)?.ok_or(ParamError::Blank(name)),
        }
    }

    pub fn integer(&self, name: &'static str) -> Result<Option<i64>, ParamError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| ParamError::invalid(name, "expected an integer")),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ParamError::invalid(name, "expected an integer")),
            Some(other) => Err(ParamError::invalid(
                name,
                format!("expected an integer, got {}", json_type(other)),
            )),
        }
    }

    /// A list of strings; a single string counts as a one-element list.
    pub fn string_list(&self, name: &'static str) -> Result<Option<Vec<String>>, ParamError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| scalar_string(item).ok_or_else(|| list_error(name, item)))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(list_error(name, other)),
        }
    }

    /// A command line: a list is taken verbatim, a string is split on whitespace.
    pub fn command(&self, name: &'static str) -> Result<Option<Vec<String>>, ParamError> {
        match self.get(name) {
            Some(Value::String(s)) => {
                let parts: Vec<String> = s.split_whitespace().map(str::to_string).collect();
                if parts.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(parts))
                }
            }
            _ => self.string_list(name),
        }
    }

    /// `KEY=VALUE` pairs from either a JSON object or a list of strings.
    pub fn key_values(&self, name: &'static str) -> Result<Option<Vec<String>>, ParamError> {
        match self.get(name) {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| match v {
                    Value::Null => Ok(k.clone()),
                    other => scalar_string(other)
                        .map(|v| format!("{}={}", k, v))
                        .ok_or_else(|| list_error(name, other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            _ => self.string_list(name),
        }
    }

    /// A string map from either a JSON object or a list of `KEY=VALUE` strings.
    pub fn string_map(
        &self,
        name: &'static str,
    ) -> Result<Option<HashMap<String, String>>, ParamError> {
        let Some(pairs) = self.key_values(name)? else {
            return Ok(None);
        };
        Ok(Some(
            pairs
                .into_iter()
                .map(|pair| match pair.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (pair, String::new()),
                })
                .collect(),
        ))
    }
}

impl<const N: usize> From<[(&str, Value); N]> for RawParameters {
    fn from(pairs: [(&str, Value); N]) -> Self {
        let mut params = Self::new();
        for (name, value) in pairs {
            params.insert(name, value);
        }
        params
    }
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn list_error(name: &'static str, value: &Value) -> ParamError {
    ParamError::invalid(
        name,
        format!("unexpected {} in list of strings", json_type(value)),
    )
}
