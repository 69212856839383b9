// ABOUTME: Container restart policy accepted in host configuration.
// ABOUTME: Parses "on-failure:3" strings or {name, maximum_retry_count} objects.

use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartPolicy {
    No,
    Always,
    UnlessStopped,
    OnFailure { max_retries: Option<u32> },
}

impl RestartPolicy {
    fn from_parts(name: &str, max_retries: Option<u32>) -> Result<Self, String> {
        let policy = match name.trim() {
            "" | "no" => RestartPolicy::No,
            "always" => RestartPolicy::Always,
            "unless-stopped" => RestartPolicy::UnlessStopped,
            "on-failure" => RestartPolicy::OnFailure { max_retries },
            other => return Err(format!("unknown restart policy: {}", other)),
        };
        if max_retries.is_some_and(|n| n > 0) && !matches!(policy, RestartPolicy::OnFailure { .. })
        {
            return Err(format!(
                "maximum retry count cannot be used with restart policy '{}'",
                policy.name()
            ));
        }
        Ok(policy)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RestartPolicy::No => "no",
            RestartPolicy::Always => "always",
            RestartPolicy::UnlessStopped => "unless-stopped",
            RestartPolicy::OnFailure { .. } => "on-failure",
        }
    }

    pub fn max_retries(&self) -> Option<u32> {
        match self {
            RestartPolicy::OnFailure { max_retries } => *max_retries,
            _ => None,
        }
    }
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, retries)) => {
                let retries = retries
                    .parse::<u32>()
                    .map_err(|_| format!("invalid max retries: {}", retries))?;
                Self::from_parts(name, Some(retries))
            }
            None => Self::from_parts(s, None),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_retries() {
            Some(n) => write!(f, "{}:{}", self.name(), n),
            None => f.write_str(self.name()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RestartPolicyRepr {
    Text(String),
    Object {
        #[serde(default, alias = "Name")]
        name: String,
        #[serde(default, alias = "MaximumRetryCount", alias = "max_retry_count")]
        maximum_retry_count: Option<u32>,
    },
}

impl<'de> Deserialize<'de> for RestartPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RestartPolicyRepr::deserialize(deserializer)? {
            RestartPolicyRepr::Text(s) => s.parse().map_err(de::Error::custom),
            RestartPolicyRepr::Object {
                name,
                maximum_retry_count,
            } => Self::from_parts(&name, maximum_retry_count).map_err(de::Error::custom),
        }
    }
}
