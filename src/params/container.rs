// ABOUTME: Container option bags built from raw request fields.
// ABOUTME: Covers creation, targeting, stop/remove flags, commit, exec, and listing.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::de;
use super::error::ParamError;
use super::host_config::HostConfigOptions;
use super::networking::{EndpointConfigOptions, NetworkConfigOptions};
use super::raw::{RawParameters, json_type, scalar_string};
use crate::types::{ContainerId, ImageRef};

/// Everything needed to create one container.
///
/// Booleans are always resolved: absent flags take their default (`false`)
/// before the options reach the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerCreateOptions {
    pub image: ImageRef,
    pub command: Option<Vec<String>>,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub detach: bool,
    pub stdin_open: bool,
    pub tty: bool,
    /// Exposed container ports, normalized to `port/proto`.
    pub ports: Vec<String>,
    pub environment: Vec<String>,
    /// Anonymous volume mount points inside the container.
    pub volumes: Vec<String>,
    pub network_disabled: bool,
    pub name: Option<String>,
    pub entrypoint: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub domainname: Option<String>,
    pub host_config: HostConfigOptions,
    /// Also copied onto the container's network endpoint, which is where the
    /// engine reads it.
    pub mac_address: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub stop_signal: Option<String>,
    pub networking_config: Option<NetworkConfigOptions>,
    pub healthcheck: Option<HealthcheckOptions>,
    pub stop_timeout: Option<i64>,
    pub runtime: Option<String>,
}

impl ContainerCreateOptions {
    /// Output streams are attached only for foreground containers.
    pub fn attach_output(&self) -> bool {
        !self.detach
    }

    pub fn attach_stdin(&self) -> bool {
        !self.detach && self.stdin_open
    }

    /// The top-level runtime wins over one given inside `host_config`.
    pub fn effective_runtime(&self) -> Option<&str> {
        self.runtime
            .as_deref()
            .or(self.host_config.runtime.as_deref())
    }
}

impl TryFrom<&RawParameters> for ContainerCreateOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        let image = raw.required_non_blank("image_name")?;
        let image = ImageRef::parse(&image)
            .map_err(|e| ParamError::invalid("image_name", e.to_string()))?;

        let name = raw.non_blank("name")?;
        if let Some(name) = &name {
            validate_container_name(name)?;
        }

        let stop_timeout = stop_timeout(raw)?;
        let host_config = HostConfigOptions::from_value(raw.get("host_config"))?;
        let mac_address = raw.non_blank("mac_address")?;
        let networking_config = place_mac_address(
            mac_address.as_deref(),
            &host_config,
            NetworkConfigOptions::from_value(raw.get("networking_config"))?,
        )?;

        Ok(Self {
            image,
            command: raw.command("command")?,
            hostname: raw.non_blank("hostname")?,
            user: raw.non_blank("user")?,
            detach: raw.flag("detach").resolve(false),
            stdin_open: raw.flag("stdin_open").resolve(false),
            tty: raw.flag("tty").resolve(false),
            ports: exposed_ports(raw.get("ports"))?,
            environment: raw.key_values("environment")?.unwrap_or_default(),
            volumes: volume_targets(raw.get("volumes"))?,
            network_disabled: raw.flag("network_disabled").resolve(false),
            name,
            entrypoint: raw.command("entrypoint")?,
            working_dir: raw.non_blank("working_dir")?,
            domainname: raw.non_blank("domainname")?,
            host_config,
            mac_address,
            labels: raw
                .string_map("labels")?
                .map(|labels| labels.into_iter().collect())
                .unwrap_or_default(),
            stop_signal: raw.non_blank("stop_signal")?,
            networking_config,
            healthcheck: HealthcheckOptions::from_value(raw.get("healthcheck"))?,
            stop_timeout,
            runtime: raw.non_blank("runtime")?,
        })
    }
}

/// Put a container-level MAC address on the single network the container
/// joins: the one named in `networking_config`, else the network mode's
/// network (`bridge` by default).
fn place_mac_address(
    mac: Option<&str>,
    host_config: &HostConfigOptions,
    networks: Option<NetworkConfigOptions>,
) -> Result<Option<NetworkConfigOptions>, ParamError> {
    let Some(mac) = mac else {
        return Ok(networks);
    };
    let mut networks = match networks {
        Some(networks) => networks,
        None => {
            let mode = host_config.network_mode.as_deref().unwrap_or("bridge");
            if matches!(mode, "host" | "none") || mode.starts_with("container:") {
                return Err(ParamError::invalid(
                    "mac_address",
                    format!("not supported with network mode '{}'", mode),
                ));
            }
            let network = if mode == "default" { "bridge" } else { mode };
            NetworkConfigOptions {
                endpoints: BTreeMap::from([(
                    network.to_string(),
                    EndpointConfigOptions::default(),
                )]),
            }
        }
    };
    if networks.endpoints.len() > 1 {
        return Err(ParamError::invalid(
            "mac_address",
            "several networks given; set mac_address per network instead",
        ));
    }
    for endpoint in networks.endpoints.values_mut() {
        match endpoint.mac_address.as_deref() {
            Some(existing) if existing != mac => {
                return Err(ParamError::invalid(
                    "mac_address",
                    format!("conflicts with the endpoint address '{}'", existing),
                ));
            }
            _ => endpoint.mac_address = Some(mac.to_string()),
        }
    }
    Ok(Some(networks))
}

/// Names follow the engine rule `[a-zA-Z0-9][a-zA-Z0-9_.-]+`, with an
/// optional leading slash.
fn validate_container_name(name: &str) -> Result<(), ParamError> {
    let bare = name.strip_prefix('/').unwrap_or(name);
    let mut chars = bare.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            let rest = chars.as_str();
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ParamError::invalid(
            "name",
            format!("'{}' is not a valid container name", name),
        ))
    }
}

/// Exposed ports from a list (`[80, "53/udp"]`), a single value, or the keys
/// of an object.
fn exposed_ports(value: Option<&Value>) -> Result<Vec<String>, ParamError> {
    let keys: Vec<String> = match value {
        None => return Ok(Vec::new()),
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                scalar_string(item).ok_or_else(|| {
                    ParamError::invalid("ports", format!("unexpected {}", json_type(item)))
                })
            })
            .collect::<Result<_, _>>()?,
        Some(other) => match scalar_string(other) {
            Some(port) => vec![port],
            None => {
                return Err(ParamError::invalid(
                    "ports",
                    format!("unexpected {}", json_type(other)),
                ));
            }
        },
    };

    let mut ports = Vec::with_capacity(keys.len());
    for key in keys {
        let port = de::port_key(&key).map_err(|reason| ParamError::invalid("ports", reason))?;
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    Ok(ports)
}

/// Volume targets from a list of paths, or the keys of an object.
fn volume_targets(value: Option<&Value>) -> Result<Vec<String>, ParamError> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map.keys().cloned().collect()),
        Some(Value::String(path)) => Ok(vec![path.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(path) => Ok(path.clone()),
                other => Err(ParamError::invalid(
                    "volumes",
                    format!("unexpected {}", json_type(other)),
                )),
            })
            .collect(),
        Some(other) => Err(ParamError::invalid(
            "volumes",
            format!("unexpected {}", json_type(other)),
        )),
    }
}

/// Container health probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthcheckOptions {
    #[serde(alias = "Test", deserialize_with = "healthcheck_test")]
    pub test: Vec<String>,
    #[serde(alias = "Interval", deserialize_with = "de::duration_nanos")]
    pub interval: Option<i64>,
    #[serde(alias = "Timeout", deserialize_with = "de::duration_nanos")]
    pub timeout: Option<i64>,
    #[serde(alias = "StartPeriod", deserialize_with = "de::duration_nanos")]
    pub start_period: Option<i64>,
    #[serde(alias = "Retries")]
    pub retries: Option<i64>,
}

impl HealthcheckOptions {
    fn from_value(value: Option<&Value>) -> Result<Option<Self>, ParamError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let check: Self = serde_json::from_value(value.clone())
            .map_err(|e| ParamError::invalid("healthcheck", e.to_string()))?;
        if check.retries.is_some_and(|r| r < 0) {
            return Err(ParamError::invalid("healthcheck", "retries cannot be negative"));
        }
        Ok(Some(check))
    }
}

/// A plain string is a shell command; a list is passed through.
fn healthcheck_test<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(cmd) if !cmd.starts_with("CMD") && !cmd.starts_with("NONE") => {
            Ok(vec!["CMD-SHELL".to_string(), cmd])
        }
        other => de::string_list(other).map_err(serde::de::Error::custom),
    }
}

/// The container an operation acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTarget {
    pub id: ContainerId,
}

impl TryFrom<&RawParameters> for ContainerTarget {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            id: container_id(raw)?,
        })
    }
}

fn container_id(raw: &RawParameters) -> Result<ContainerId, ParamError> {
    let id = raw.required_non_blank("container_id")?;
    ContainerId::parse(&id).map_err(|e| ParamError::invalid("container_id", e.to_string()))
}

/// Grace period in seconds; the engine takes it as a 32-bit signed value.
fn stop_timeout(raw: &RawParameters) -> Result<Option<i64>, ParamError> {
    match raw.integer("stop_timeout")? {
        Some(t) if t < 0 => Err(ParamError::invalid("stop_timeout", "cannot be negative")),
        Some(t) if t > i64::from(i32::MAX) => Err(ParamError::invalid(
            "stop_timeout",
            format!("cannot exceed {} seconds", i32::MAX),
        )),
        other => Ok(other),
    }
}

/// Stop or restart, with an optional grace period in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOptions {
    pub id: ContainerId,
    pub timeout: Option<i64>,
}

impl TryFrom<&RawParameters> for StopOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            id: container_id(raw)?,
            timeout: stop_timeout(raw)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveContainerOptions {
    pub id: ContainerId,
    pub force: bool,
}

impl TryFrom<&RawParameters> for RemoveContainerOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            id: container_id(raw)?,
            force: raw.flag("force").resolve(false),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListContainersOptions {
    pub all: bool,
}

impl TryFrom<&RawParameters> for ListContainersOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        Ok(Self {
            all: raw.flag("all").resolve(false),
        })
    }
}

/// Snapshot a container's filesystem into a new image.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOptions {
    pub id: ContainerId,
    pub repository: String,
    pub tag: Option<String>,
    pub message: Option<String>,
    pub author: Option<String>,
    pub changes: Option<String>,
    /// Container configuration overrides, passed to the engine as given.
    pub conf: Option<Map<String, Value>>,
}

impl TryFrom<&RawParameters> for CommitOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        let conf = match raw.get("conf") {
            None => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(other) => {
                return Err(ParamError::invalid(
                    "conf",
                    format!("expected an object, got {}", json_type(other)),
                ));
            }
        };
        let changes = raw
            .string_list("changes")?
            .map(|lines| lines.join("\n"))
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            id: container_id(raw)?,
            repository: raw.required_non_blank("repo_name")?,
            tag: raw.non_blank("tag_name")?,
            message: raw.non_blank("message")?,
            author: raw.non_blank("author")?,
            changes,
            conf,
        })
    }
}

/// Run a command inside a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    pub id: ContainerId,
    pub cmd: Vec<String>,
}

impl TryFrom<&RawParameters> for ExecOptions {
    type Error = ParamError;

    fn try_from(raw: &RawParameters) -> Result<Self, Self::Error> {
        let id = container_id(raw)?;
        let cmd = match raw.command("cmd")? {
            Some(cmd) if !cmd.is_empty() => cmd,
            Some(_) => return Err(ParamError::Blank("cmd")),
            None if raw.get("cmd").is_some() => return Err(ParamError::Blank("cmd")),
            None => return Err(ParamError::Missing("cmd")),
        };
        Ok(Self { id, cmd })
    }
}
