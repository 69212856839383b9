// ABOUTME: Host-level container settings: resources, namespaces, mounts, and policies.
// ABOUTME: Fields with engine-mandated defaults are always populated; the rest stay unset.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::de::{self, PortBindingSpec};
use super::error::ParamError;
use super::restart_policy::RestartPolicy;

/// Host configuration for a new container.
///
/// Every field is optional in the request. The derived `Default` is the
/// default table: `oom_kill_disable`, `publish_all_ports`, `privileged`,
/// `read_only` and `init` are `false`, `pid_mode` is empty and `pids_limit`
/// is `0`. Everything else stays `None` or empty, which leaves the decision
/// to the engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfigOptions {
    #[serde(deserialize_with = "de::binds")]
    pub binds: Vec<String>,
    #[serde(deserialize_with = "de::port_bindings")]
    pub port_bindings: BTreeMap<String, Vec<PortBindingSpec>>,
    #[serde(deserialize_with = "de::flag")]
    pub publish_all_ports: bool,
    #[serde(deserialize_with = "de::colon_pairs")]
    pub links: Vec<String>,
    #[serde(deserialize_with = "de::flag")]
    pub privileged: bool,
    #[serde(deserialize_with = "de::flag")]
    pub read_only: bool,
    #[serde(deserialize_with = "de::flag")]
    pub init: bool,
    #[serde(deserialize_with = "de::flag")]
    pub auto_remove: bool,

    #[serde(deserialize_with = "de::string_list")]
    pub dns: Vec<String>,
    #[serde(deserialize_with = "de::string_list")]
    pub dns_search: Vec<String>,
    #[serde(alias = "dns_options", deserialize_with = "de::string_list")]
    pub dns_opt: Vec<String>,
    #[serde(deserialize_with = "de::colon_pairs")]
    pub extra_hosts: Vec<String>,

    pub network_mode: Option<String>,
    pub pid_mode: String,
    pub ipc_mode: Option<String>,
    pub userns_mode: Option<String>,
    pub uts_mode: Option<String>,

    pub restart_policy: Option<RestartPolicy>,

    #[serde(deserialize_with = "de::string_list")]
    pub cap_add: Vec<String>,
    #[serde(deserialize_with = "de::string_list")]
    pub cap_drop: Vec<String>,
    #[serde(deserialize_with = "de::string_list")]
    pub security_opt: Vec<String>,
    #[serde(deserialize_with = "de::string_list")]
    pub devices: Vec<String>,
    #[serde(deserialize_with = "de::string_list")]
    pub volumes_from: Vec<String>,
    #[serde(deserialize_with = "de::string_list")]
    pub group_add: Vec<String>,

    pub ulimits: Vec<UlimitOptions>,
    pub log_config: Option<LogConfigOptions>,
    pub mounts: Vec<MountOptions>,

    #[serde(alias = "memory", deserialize_with = "de::byte_size")]
    pub mem_limit: Option<i64>,
    #[serde(alias = "memory_swap", deserialize_with = "de::byte_size")]
    pub memswap_limit: Option<i64>,
    #[serde(alias = "memory_reservation", deserialize_with = "de::byte_size")]
    pub mem_reservation: Option<i64>,
    #[serde(alias = "memory_swappiness")]
    pub mem_swappiness: Option<i64>,
    #[serde(deserialize_with = "de::byte_size")]
    pub shm_size: Option<i64>,
    #[serde(deserialize_with = "de::flag")]
    pub oom_kill_disable: bool,
    pub oom_score_adj: Option<i64>,
    #[serde(alias = "pid_limit")]
    pub pids_limit: i64,

    pub cpu_shares: Option<i64>,
    pub cpu_period: Option<i64>,
    pub cpu_quota: Option<i64>,
    pub cpu_rt_period: Option<i64>,
    pub cpu_rt_runtime: Option<i64>,
    pub nano_cpus: Option<i64>,
    pub cpuset_cpus: Option<String>,
    pub cpuset_mems: Option<String>,

    pub blkio_weight: Option<u16>,
    pub blkio_weight_device: Vec<WeightDeviceOptions>,
    pub device_read_bps: Vec<ThrottleDeviceOptions>,
    pub device_write_bps: Vec<ThrottleDeviceOptions>,
    pub device_read_iops: Vec<ThrottleDeviceOptions>,
    pub device_write_iops: Vec<ThrottleDeviceOptions>,

    pub sysctls: BTreeMap<String, String>,
    #[serde(deserialize_with = "tmpfs")]
    pub tmpfs: BTreeMap<String, String>,
    pub storage_opt: BTreeMap<String, String>,
    pub cgroup_parent: Option<String>,
    pub volume_driver: Option<String>,
    pub runtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UlimitOptions {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Soft")]
    pub soft: i64,
    #[serde(alias = "Hard")]
    pub hard: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfigOptions {
    #[serde(alias = "Type")]
    pub r#type: String,
    #[serde(default, alias = "Config")]
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightDeviceOptions {
    #[serde(alias = "Path")]
    pub path: String,
    #[serde(alias = "Weight")]
    pub weight: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleDeviceOptions {
    #[serde(alias = "Path")]
    pub path: String,
    #[serde(alias = "Rate")]
    pub rate: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    #[default]
    Volume,
    Bind,
    Tmpfs,
}

impl MountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MountKind::Volume => "volume",
            MountKind::Bind => "bind",
            MountKind::Tmpfs => "tmpfs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountOptions {
    #[serde(alias = "Target")]
    pub target: String,
    #[serde(default, alias = "Source")]
    pub source: Option<String>,
    #[serde(default, alias = "Type")]
    pub r#type: MountKind,
    #[serde(default, alias = "ReadOnly", deserialize_with = "de::flag")]
    pub read_only: bool,
}

/// tmpfs mounts as `{path: options}` or a list of `path[:options]`.
fn tmpfs<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = de::colon_pairs(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry.split_once(':') {
            Some((path, opts)) => (path.to_string(), opts.to_string()),
            None => (entry, String::new()),
        })
        .collect())
}

impl HostConfigOptions {
    /// Parse the `host_config` request field. An absent field yields the
    /// default table.
    pub fn from_value(value: Option<&serde_json::Value>) -> Result<Self, ParamError> {
        let options: Self = match value {
            None => Self::default(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| ParamError::invalid("host_config", e.to_string()))?,
        };
        options.validate()?;
        Ok(options)
    }

    /// Reject combinations the engine would refuse anyway.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.nano_cpus.is_some() && (self.cpu_period.is_some() || self.cpu_quota.is_some()) {
            return Err(ParamError::invalid(
                "host_config",
                "nano_cpus conflicts with cpu_period and cpu_quota",
            ));
        }
        if self.memswap_limit.is_some_and(|s| s != -1) && self.mem_limit.is_none() {
            return Err(ParamError::invalid(
                "host_config",
                "memswap_limit requires mem_limit",
            ));
        }
        if let (Some(limit), Some(swap)) = (self.mem_limit, self.memswap_limit)
            && swap != -1
            && swap < limit
        {
            return Err(ParamError::invalid(
                "host_config",
                "memswap_limit must be at least mem_limit",
            ));
        }
        if self.auto_remove
            && self
                .restart_policy
                .as_ref()
                .is_some_and(|p| *p != RestartPolicy::No)
        {
            return Err(ParamError::invalid(
                "host_config",
                "auto_remove cannot be combined with a restart policy",
            ));
        }
        if self.mem_swappiness.is_some_and(|s| !(-1..=100).contains(&s)) {
            return Err(ParamError::invalid(
                "host_config",
                "mem_swappiness must be between 0 and 100",
            ));
        }
        if self.pids_limit < -1 {
            return Err(ParamError::invalid(
                "host_config",
                "pids_limit must be -1 or greater",
            ));
        }
        Ok(())
    }
}
