// ABOUTME: Renders option bags into the engine's JSON wire format.
// ABOUTME: Defaulted host fields are always sent; unset optional fields are omitted.

use crate::params::{
    ContainerCreateOptions, EndpointConfigOptions, HealthcheckOptions, HostConfigOptions,
    NetworkConfigOptions, PortBindingSpec, ThrottleDeviceOptions,
};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// A JSON object under construction that skips unset and empty fields.
#[derive(Default)]
struct Wire(Map<String, Value>);

impl Wire {
    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    fn opt<T: Into<Value>>(&mut self, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    fn text(&mut self, key: &str, value: &Option<String>) {
        self.opt(key, value.clone());
    }

    fn list(&mut self, key: &str, values: &[String]) {
        if !values.is_empty() {
            self.set(key, values.to_vec());
        }
    }

    fn map(&mut self, key: &str, values: &BTreeMap<String, String>) {
        if !values.is_empty() {
            self.set(key, json!(values));
        }
    }

    fn objects(&mut self, key: &str, values: Vec<Value>) {
        if !values.is_empty() {
            self.set(key, Value::Array(values));
        }
    }

    fn finish(self) -> Value {
        Value::Object(self.0)
    }
}

/// `{"80/tcp": {}, ...}` set notation used for ports and volumes.
fn key_set(keys: &[String]) -> Value {
    Value::Object(keys.iter().map(|k| (k.clone(), json!({}))).collect())
}

/// Container create request body.
pub fn container_create_body(options: &ContainerCreateOptions) -> Value {
    let mut wire = Wire::default();
    wire.set("Image", options.image.as_str());
    wire.text("Hostname", &options.hostname);
    wire.text("Domainname", &options.domainname);
    wire.text("User", &options.user);
    wire.set("AttachStdin", options.attach_stdin());
    wire.set("AttachStdout", options.attach_output());
    wire.set("AttachStderr", options.attach_output());
    wire.set("Tty", options.tty);
    wire.set("OpenStdin", options.stdin_open);
    wire.set("StdinOnce", options.attach_stdin());
    wire.set("NetworkDisabled", options.network_disabled);
    if !options.ports.is_empty() {
        wire.set("ExposedPorts", key_set(&options.ports));
    }
    if !options.volumes.is_empty() {
        wire.set("Volumes", key_set(&options.volumes));
    }
    wire.list("Env", &options.environment);
    wire.opt("Cmd", options.command.clone());
    wire.opt("Entrypoint", options.entrypoint.clone());
    wire.text("WorkingDir", &options.working_dir);
    wire.map("Labels", &options.labels);
    wire.text("StopSignal", &options.stop_signal);
    wire.opt("StopTimeout", options.stop_timeout);
    wire.opt("Healthcheck", options.healthcheck.as_ref().map(healthcheck));

    let mut host = host_config(&options.host_config);
    if let (Some(runtime), Value::Object(map)) = (options.effective_runtime(), &mut host) {
        map.insert("Runtime".to_string(), json!(runtime));
    }
    wire.set("HostConfig", host);

    // An empty endpoint map is never sent.
    if let Some(networks) = options
        .networking_config
        .as_ref()
        .filter(|n| !n.endpoints.is_empty())
    {
        wire.set("NetworkingConfig", networking_config(networks));
    }
    wire.finish()
}

pub fn healthcheck(check: &HealthcheckOptions) -> Value {
    let mut wire = Wire::default();
    wire.list("Test", &check.test);
    wire.opt("Interval", check.interval);
    wire.opt("Timeout", check.timeout);
    wire.opt("StartPeriod", check.start_period);
    wire.opt("Retries", check.retries);
    wire.finish()
}

pub fn host_config(options: &HostConfigOptions) -> Value {
    let mut wire = Wire::default();

    // Engine-mandated defaults, always present.
    wire.set("OomKillDisable", options.oom_kill_disable);
    wire.set("PidMode", options.pid_mode.as_str());
    wire.set("PidsLimit", options.pids_limit);
    wire.set("PublishAllPorts", options.publish_all_ports);
    wire.set("Privileged", options.privileged);
    wire.set("ReadonlyRootfs", options.read_only);
    wire.set("Init", options.init);

    if options.auto_remove {
        wire.set("AutoRemove", true);
    }
    wire.list("Binds", &options.binds);
    if !options.port_bindings.is_empty() {
        wire.set("PortBindings", port_bindings(&options.port_bindings));
    }
    wire.list("Links", &options.links);
    wire.list("Dns", &options.dns);
    wire.list("DnsSearch", &options.dns_search);
    wire.list("DnsOptions", &options.dns_opt);
    wire.list("ExtraHosts", &options.extra_hosts);
    wire.text("NetworkMode", &options.network_mode);
    wire.text("IpcMode", &options.ipc_mode);
    wire.text("UsernsMode", &options.userns_mode);
    wire.text("UTSMode", &options.uts_mode);
    if let Some(policy) = &options.restart_policy {
        let mut restart = Wire::default();
        restart.set("Name", policy.name());
        restart.opt("MaximumRetryCount", policy.max_retries());
        wire.set("RestartPolicy", restart.finish());
    }
    wire.list("CapAdd", &options.cap_add);
    wire.list("CapDrop", &options.cap_drop);
    wire.list("SecurityOpt", &options.security_opt);
    wire.objects(
        "Devices",
        options.devices.iter().map(|d| device_mapping(d)).collect(),
    );
    wire.list("VolumesFrom", &options.volumes_from);
    wire.list("GroupAdd", &options.group_add);
    wire.objects(
        "Ulimits",
        options
            .ulimits
            .iter()
            .map(|u| json!({"Name": u.name, "Soft": u.soft, "Hard": u.hard}))
            .collect(),
    );
    wire.opt(
        "LogConfig",
        options
            .log_config
            .as_ref()
            .map(|l| json!({"Type": l.r#type, "Config": l.config})),
    );
    wire.objects(
        "Mounts",
        options
            .mounts
            .iter()
            .map(|m| {
                let mut mount = Wire::default();
                mount.set("Target", m.target.as_str());
                mount.text("Source", &m.source);
                mount.set("Type", m.r#type.as_str());
                mount.set("ReadOnly", m.read_only);
                mount.finish()
            })
            .collect(),
    );

    wire.opt("Memory", options.mem_limit);
    wire.opt("MemorySwap", options.memswap_limit);
    wire.opt("MemoryReservation", options.mem_reservation);
    wire.opt("MemorySwappiness", options.mem_swappiness);
    wire.opt("ShmSize", options.shm_size);
    wire.opt("OomScoreAdj", options.oom_score_adj);

    wire.opt("CpuShares", options.cpu_shares);
    wire.opt("CpuPeriod", options.cpu_period);
    wire.opt("CpuQuota", options.cpu_quota);
    wire.opt("CpuRealtimePeriod", options.cpu_rt_period);
    wire.opt("CpuRealtimeRuntime", options.cpu_rt_runtime);
    wire.opt("NanoCpus", options.nano_cpus);
    wire.text("CpusetCpus", &options.cpuset_cpus);
    wire.text("CpusetMems", &options.cpuset_mems);

    wire.opt("BlkioWeight", options.blkio_weight);
    wire.objects(
        "BlkioWeightDevice",
        options
            .blkio_weight_device
            .iter()
            .map(|d| json!({"Path": d.path, "Weight": d.weight}))
            .collect(),
    );
    wire.objects("BlkioDeviceReadBps", throttles(&options.device_read_bps));
    wire.objects("BlkioDeviceWriteBps", throttles(&options.device_write_bps));
    wire.objects("BlkioDeviceReadIOps", throttles(&options.device_read_iops));
    wire.objects("BlkioDeviceWriteIOps", throttles(&options.device_write_iops));

    wire.map("Sysctls", &options.sysctls);
    wire.map("Tmpfs", &options.tmpfs);
    wire.map("StorageOpt", &options.storage_opt);
    wire.text("CgroupParent", &options.cgroup_parent);
    wire.text("VolumeDriver", &options.volume_driver);
    wire.text("Runtime", &options.runtime);
    wire.finish()
}

fn port_bindings(bindings: &BTreeMap<String, Vec<PortBindingSpec>>) -> Value {
    Value::Object(
        bindings
            .iter()
            .map(|(port, specs)| {
                let specs = specs
                    .iter()
                    .map(|spec| {
                        json!({
                            "HostIp": spec.host_ip.clone().unwrap_or_default(),
                            "HostPort": spec.host_port.clone().unwrap_or_default(),
                        })
                    })
                    .collect();
                (port.clone(), Value::Array(specs))
            })
            .collect(),
    )
}

/// `host[:container[:permissions]]`; container path defaults to the host
/// path and permissions to `rwm`.
fn device_mapping(spec: &str) -> Value {
    let mut parts = spec.splitn(3, ':');
    let host = parts.next().unwrap_or_default();
    let container = parts.next().filter(|p| !p.is_empty()).unwrap_or(host);
    let permissions = parts.next().filter(|p| !p.is_empty()).unwrap_or("rwm");
    json!({
        "PathOnHost": host,
        "PathInContainer": container,
        "CgroupPermissions": permissions,
    })
}

fn throttles(devices: &[ThrottleDeviceOptions]) -> Vec<Value> {
    devices
        .iter()
        .map(|d| json!({"Path": d.path, "Rate": d.rate}))
        .collect()
}

pub fn networking_config(networks: &NetworkConfigOptions) -> Value {
    let endpoints: Map<String, Value> = networks
        .endpoints
        .iter()
        .map(|(name, endpoint)| (name.clone(), endpoint_settings(endpoint)))
        .collect();
    json!({ "EndpointsConfig": endpoints })
}

fn endpoint_settings(endpoint: &EndpointConfigOptions) -> Value {
    let mut wire = Wire::default();
    wire.list("Aliases", &endpoint.aliases);
    wire.list("Links", &endpoint.links);
    wire.text("MacAddress", &endpoint.mac_address);
    wire.map("DriverOpts", &endpoint.driver_opts);

    let mut ipam = Wire::default();
    ipam.text("IPv4Address", &endpoint.ipv4_address);
    ipam.text("IPv6Address", &endpoint.ipv6_address);
    ipam.list("LinkLocalIPs", &endpoint.link_local_ips);
    let ipam = ipam.finish();
    if ipam.as_object().is_some_and(|m| !m.is_empty()) {
        wire.set("IPAMConfig", ipam);
    }
    wire.finish()
}
