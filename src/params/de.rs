// ABOUTME: Lenient serde deserializers for nested option bags.
// ABOUTME: Accepts the several shapes callers use for flags, sizes, ports, and binds.

use serde::Deserialize;
use serde::de::{self, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::raw::{Flag, json_type, scalar_string};

/// A boolean with presence semantics: `null` is false, negative literals are
/// false, anything else is true.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Flag::from_value(Some(&value)).resolve(false))
}

/// Byte sizes given as integers or as strings with a b/k/m/g suffix.
pub fn byte_size<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom("byte size must be an integer")),
        Value::String(s) => parse_bytes(&s).map(Some).map_err(de::Error::custom),
        other => Err(de::Error::custom(format!(
            "byte size must be a number or string, got {}",
            json_type(&other)
        ))),
    }
}

pub fn parse_bytes(input: &str) -> Result<i64, String> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err("byte size cannot be empty".to_string());
    }
    let s = s.strip_suffix('b').unwrap_or(&s);
    let (digits, multiplier) = match s.chars().last() {
        Some('k') => (&s[..s.len() - 1], 1024_i64),
        Some('m') => (&s[..s.len() - 1], 1024 * 1024),
        Some('g') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1),
    };
    let digits = digits.trim();
    if digits.starts_with('-') {
        return Err(format!("byte size cannot be negative: {}", input));
    }
    digits
        .parse::<i64>()
        .map_err(|_| format!("invalid byte size: {}", input))?
        .checked_mul(multiplier)
        .ok_or_else(|| format!("byte size out of range: {}", input))
}

/// Durations given as integer nanoseconds or as human-readable text ("10s").
#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Nanos(i64),
    Human(#[serde(with = "humantime_serde")] Duration),
}

pub fn duration_nanos<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<DurationRepr>::deserialize(deserializer)? {
            None => None,
            Some(DurationRepr::Nanos(n)) => Some(n),
            Some(DurationRepr::Human(d)) => Some(
                i64::try_from(d.as_nanos())
                    .map_err(|_| de::Error::custom(format!("duration too long: {:?}", d)))?,
            ),
        },
    )
}

/// A list of strings where a single string is a one-element list.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                scalar_string(v).ok_or_else(|| {
                    de::Error::custom(format!("unexpected {} in string list", json_type(v)))
                })
            })
            .collect(),
        other => Err(de::Error::custom(format!(
            "expected a string list, got {}",
            json_type(&other)
        ))),
    }
}

/// A list of `left:right` strings, also accepting a `{left: right}` object.
pub fn colon_pairs<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| match scalar_string(&v) {
                Some(v) => Ok(format!("{}:{}", k, v)),
                None if v.is_null() => Ok(k),
                None => Err(de::Error::custom(format!(
                    "unexpected {} for {}",
                    json_type(&v),
                    k
                ))),
            })
            .collect(),
        other => string_list(other).map_err(de::Error::custom),
    }
}

/// Bind mounts as `host:container[:mode]` strings or the
/// `{host: {bind, mode}}` object form.
pub fn binds<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct BindSpec {
        bind: String,
        #[serde(default)]
        mode: Option<String>,
        #[serde(default, deserialize_with = "flag")]
        ro: bool,
    }

    match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .map(|(host, spec)| match spec {
                Value::String(container) => Ok(format!("{}:{}:rw", host, container)),
                other => {
                    let spec: BindSpec =
                        serde_json::from_value(other).map_err(de::Error::custom)?;
                    let mode = spec
                        .mode
                        .unwrap_or_else(|| if spec.ro { "ro" } else { "rw" }.to_string());
                    Ok(format!("{}:{}:{}", host, spec.bind, mode))
                }
            })
            .collect(),
        other => string_list(other).map_err(de::Error::custom),
    }
}

/// One host-side binding for a container port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortBindingSpec {
    pub host_ip: Option<String>,
    pub host_port: Option<String>,
}

impl PortBindingSpec {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Number(n) => Ok(Self {
                host_ip: None,
                host_port: Some(n.to_string()),
            }),
            Value::String(s) => Ok(match s.rsplit_once(':') {
                Some((ip, port)) => Self {
                    host_ip: Some(ip.to_string()),
                    host_port: Some(port.to_string()).filter(|p| !p.is_empty()),
                },
                None => Self {
                    host_ip: None,
                    host_port: Some(s).filter(|p| !p.is_empty()),
                },
            }),
            Value::Object(map) => {
                let field = |keys: &[&str]| {
                    keys.iter()
                        .find_map(|k| map.get(*k))
                        .and_then(scalar_string)
                        .filter(|s| !s.is_empty())
                };
                Ok(Self {
                    host_ip: field(&["host_ip", "HostIp"]),
                    host_port: field(&["host_port", "HostPort"]),
                })
            }
            Value::Array(mut items) if items.len() == 2 => {
                // (ip, port) tuple form
                let port = items.pop().and_then(|v| scalar_string(&v));
                let ip = items.pop().and_then(|v| scalar_string(&v));
                Ok(Self {
                    host_ip: ip,
                    host_port: port,
                })
            }
            other => Err(format!("unsupported port binding: {}", json_type(&other))),
        }
    }
}

/// Normalize a container port key to `port/proto`, defaulting to tcp.
pub fn port_key(key: &str) -> Result<String, String> {
    let key = key.trim();
    let (port, proto) = key.split_once('/').unwrap_or((key, "tcp"));
    port.parse::<u16>()
        .map_err(|_| format!("invalid container port: {}", key))?;
    match proto {
        "tcp" | "udp" | "sctp" => Ok(format!("{}/{}", port, proto)),
        other => Err(format!("invalid port protocol: {}", other)),
    }
}

/// Port bindings keyed by container port. Each value may be a single binding
/// or a list of bindings.
pub fn port_bindings<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<PortBindingSpec>>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Object(map) => map,
        other => {
            return Err(de::Error::custom(format!(
                "port bindings must be an object, got {}",
                json_type(&other)
            )));
        }
    };

    let mut bindings = BTreeMap::new();
    for (key, value) in map {
        let key = port_key(&key).map_err(de::Error::custom)?;
        let specs = match value {
            Value::Array(items) if !is_ip_port_tuple(&items) => items
                .into_iter()
                .map(PortBindingSpec::from_value)
                .collect::<Result<Vec<_>, _>>(),
            other => PortBindingSpec::from_value(other).map(|spec| vec![spec]),
        }
        .map_err(de::Error::custom)?;
        bindings.insert(key, specs);
    }
    Ok(bindings)
}

fn is_ip_port_tuple(items: &[Value]) -> bool {
    matches!(items, [Value::String(ip), _] if ip.contains('.') || ip.contains(':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "port_bindings")]
        ports: BTreeMap<String, Vec<PortBindingSpec>>,
        #[serde(default, deserialize_with = "byte_size")]
        size: Option<i64>,
        #[serde(default, deserialize_with = "binds")]
        binds: Vec<String>,
        #[serde(default, deserialize_with = "duration_nanos")]
        interval: Option<i64>,
    }

    fn sample(value: Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parse_bytes_suffixes() {
        assert_eq!(parse_bytes("512"), Ok(512));
        assert_eq!(parse_bytes("1k"), Ok(1024));
        assert_eq!(parse_bytes("2m"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_bytes("1GB"), Ok(1024 * 1024 * 1024));
        assert!(parse_bytes("lots").is_err());
        assert!(parse_bytes("-1m").is_err());
    }

    #[test]
    fn parse_bytes_rejects_non_numbers_and_overflow() {
        assert!(parse_bytes("nan").is_err());
        assert!(parse_bytes("infg").is_err());
        assert!(parse_bytes("inf").is_err());
        assert!(parse_bytes("1.5g").is_err());
        assert!(parse_bytes("9223372036854775807k").is_err());
        assert_eq!(parse_bytes("8589934591g"), Ok(8589934591 * 1024 * 1024 * 1024));
    }

    #[test]
    fn oversized_durations_are_rejected() {
        assert_eq!(sample(json!({"interval": "10s"})).interval, Some(10_000_000_000));
        assert!(serde_json::from_value::<Sample>(json!({"interval": "1000000000000s"})).is_err());
    }

    #[test]
    fn byte_size_accepts_numbers_and_strings() {
        assert_eq!(sample(json!({"size": 64})).size, Some(64));
        assert_eq!(sample(json!({"size": "1m"})).size, Some(1024 * 1024));
    }

    #[test]
    fn port_bindings_shapes() {
        let p = sample(json!({"ports": {
            "80": 8080,
            "53/udp": "127.0.0.1:5353",
            "443/tcp": [{"HostPort": "8443"}, {"host_ip": "::1", "host_port": 9443}],
            "22": ["0.0.0.0", 2222],
            "9000": null
        }}));
        assert_eq!(p.ports["80/tcp"][0].host_port.as_deref(), Some("8080"));
        assert_eq!(p.ports["53/udp"][0].host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(p.ports["53/udp"][0].host_port.as_deref(), Some("5353"));
        assert_eq!(p.ports["443/tcp"].len(), 2);
        assert_eq!(p.ports["22/tcp"][0].host_port.as_deref(), Some("2222"));
        assert_eq!(p.ports["9000/tcp"][0], PortBindingSpec::default());
    }

    #[test]
    fn port_key_rejects_garbage() {
        assert!(port_key("http").is_err());
        assert!(port_key("80/icmp").is_err());
        assert_eq!(port_key("80"), Ok("80/tcp".to_string()));
    }

    #[test]
    fn binds_object_form() {
        let p = sample(json!({"binds": {"/srv/data": {"bind": "/data", "mode": "ro"}}}));
        assert_eq!(p.binds, vec!["/srv/data:/data:ro".to_string()]);
        let p = sample(json!({"binds": ["/a:/b"]}));
        assert_eq!(p.binds, vec!["/a:/b".to_string()]);
    }

    #[test]
    fn durations_accept_nanos_and_text() {
        assert_eq!(sample(json!({"interval": 1000})).interval, Some(1000));
        assert_eq!(
            sample(json!({"interval": "2s"})).interval,
            Some(2_000_000_000)
        );
    }
}
