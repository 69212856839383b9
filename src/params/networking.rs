// ABOUTME: Per-network endpoint settings attached at container creation.
// ABOUTME: Accepts a bare {network: endpoint} map or an EndpointsConfig wrapper.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::de;
use super::error::ParamError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfigOptions {
    #[serde(alias = "Aliases", deserialize_with = "de::string_list")]
    pub aliases: Vec<String>,
    #[serde(alias = "Links", deserialize_with = "de::colon_pairs")]
    pub links: Vec<String>,
    #[serde(alias = "IPv4Address")]
    pub ipv4_address: Option<String>,
    #[serde(alias = "IPv6Address")]
    pub ipv6_address: Option<String>,
    #[serde(alias = "LinkLocalIPs", deserialize_with = "de::string_list")]
    pub link_local_ips: Vec<String>,
    #[serde(alias = "MacAddress")]
    pub mac_address: Option<String>,
    #[serde(alias = "DriverOpts")]
    pub driver_opts: BTreeMap<String, String>,
}

/// Network endpoints keyed by network name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfigOptions {
    pub endpoints: BTreeMap<String, EndpointConfigOptions>,
}

impl NetworkConfigOptions {
    /// Parse the `networking_config` request field. Returns `None` when the
    /// field is absent or names no networks.
    pub fn from_value(value: Option<&Value>) -> Result<Option<Self>, ParamError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let map = match value {
            Value::Object(map) => map,
            _ => {
                return Err(ParamError::invalid(
                    "networking_config",
                    "expected an object keyed by network name",
                ));
            }
        };
        let inner = map
            .get("EndpointsConfig")
            .or_else(|| map.get("endpoints_config"))
            .unwrap_or(value);

        let endpoints: BTreeMap<String, Option<EndpointConfigOptions>> =
            serde_json::from_value(inner.clone())
                .map_err(|e| ParamError::invalid("networking_config", e.to_string()))?;

        if endpoints.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            endpoints: endpoints
                .into_iter()
                .map(|(network, endpoint)| (network, endpoint.unwrap_or_default()))
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_empty_yield_none() {
        assert_eq!(NetworkConfigOptions::from_value(None).unwrap(), None);
        assert_eq!(
            NetworkConfigOptions::from_value(Some(&json!({}))).unwrap(),
            None
        );
    }

    #[test]
    fn bare_map_and_wrapper_are_equivalent() {
        let bare = json!({"backend": {"aliases": ["api"], "ipv4_address": "172.20.0.5"}});
        let wrapped = json!({"EndpointsConfig": {"backend": {"Aliases": ["api"], "IPv4Address": "172.20.0.5"}}});
        let a = NetworkConfigOptions::from_value(Some(&bare)).unwrap();
        let b = NetworkConfigOptions::from_value(Some(&wrapped)).unwrap();
        assert_eq!(a, b);
        let endpoint = &a.unwrap().endpoints["backend"];
        assert_eq!(endpoint.aliases, vec!["api".to_string()]);
    }

    #[test]
    fn null_endpoint_means_defaults() {
        let config = NetworkConfigOptions::from_value(Some(&json!({"frontend": null})))
            .unwrap()
            .unwrap();
        assert_eq!(config.endpoints["frontend"], EndpointConfigOptions::default());
    }

    #[test]
    fn rejects_non_objects() {
        assert!(NetworkConfigOptions::from_value(Some(&json!(["a"]))).is_err());
        assert!(NetworkConfigOptions::from_value(Some(&json!({"n": {"bogus": 1}}))).is_err());
    }
}
