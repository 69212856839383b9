// ABOUTME: Config values that may be read from environment variables.
// ABOUTME: Keeps registry secrets out of berth.yml.

use crate::error::{Error, Result};
use serde::Deserialize;

/// A literal string, or `{env: VAR, default: ...}`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => std::env::var(var)
                .ok()
                .or_else(|| default.clone())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }
}

// Literals are usually secrets.
impl std::fmt::Debug for EnvValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvValue::Literal(_) => f.write_str("Literal(<redacted>)"),
            EnvValue::FromEnv { var, .. } => f.debug_struct("FromEnv").field("var", var).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        assert_eq!(EnvValue::Literal("s3cret".into()).resolve().unwrap(), "s3cret");
    }

    #[test]
    fn env_reference_falls_back_to_default() {
        let value = EnvValue::FromEnv {
            var: "BERTH_TEST_UNSET_PASSWORD".into(),
            default: Some("fallback".into()),
        };
        temp_env::with_var_unset("BERTH_TEST_UNSET_PASSWORD", || {
            assert_eq!(value.resolve().unwrap(), "fallback");
        });
        temp_env::with_var("BERTH_TEST_UNSET_PASSWORD", Some("from-env"), || {
            assert_eq!(value.resolve().unwrap(), "from-env");
        });
    }

    #[test]
    fn missing_env_without_default_is_an_error() {
        let value = EnvValue::FromEnv {
            var: "BERTH_TEST_MISSING".into(),
            default: None,
        };
        temp_env::with_var_unset("BERTH_TEST_MISSING", || {
            assert!(matches!(value.resolve(), Err(Error::MissingEnvVar(v)) if v == "BERTH_TEST_MISSING"));
        });
    }

    #[test]
    fn debug_hides_literals() {
        let printed = format!("{:?}", EnvValue::Literal("hunter2".into()));
        assert!(!printed.contains("hunter2"));
    }
}
