// ABOUTME: Configuration types and parsing for berth.yml.
// ABOUTME: Handles discovery, defaults, and conversion into gateway settings.

mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::init_config;

use crate::engine::{ConnectError, Endpoint, RegistryAuth, detect_local};
use crate::error::{Error, Result};
use crate::gateway::GatewaySettings;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "berth.yml";
pub const CONFIG_FILENAME_ALT: &str = "berth.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".berth/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub registry: Option<RegistryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Unset means auto-detect.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bound on each engine round trip.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Client-level timeout handed to bollard.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    #[serde(default = "default_lines")]
    pub log_lines: usize,
    #[serde(default = "default_lines")]
    pub attach_lines: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            log_lines: default_lines(),
            attach_lines: default_lines(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub username: String,
    pub password: EnvValue,
    #[serde(default)]
    pub server: Option<String>,
}

impl RegistryConfig {
    pub fn resolve(&self) -> Result<RegistryAuth> {
        Ok(RegistryAuth {
            username: self.username.clone(),
            password: self.password.resolve()?,
            server: self.server.clone(),
        })
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_lines() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            engine: EngineConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
            registry: None,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// The first of `berth.yml`, `berth.yaml`, `.berth/config.yml` in `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("loading configuration from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like `discover`, but a missing file yields the defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => {
                tracing::debug!("no configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.engine.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "engine.timeout must be greater than zero".to_string(),
            ));
        }
        if self.limits.log_lines == 0 || self.limits.attach_lines == 0 {
            return Err(Error::InvalidConfig(
                "limits must be greater than zero".to_string(),
            ));
        }
        if let Some(endpoint) = &self.engine.endpoint {
            Endpoint::parse(endpoint).map_err(|reason| {
                Error::InvalidConfig(format!("engine.endpoint '{}': {}", endpoint, reason))
            })?;
        }
        Ok(())
    }

    /// The configured endpoint, or the first local engine socket found.
    pub fn endpoint(&self) -> std::result::Result<Endpoint, ConnectError> {
        match &self.engine.endpoint {
            Some(endpoint) => {
                Endpoint::parse(endpoint).map_err(|reason| ConnectError::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    reason,
                })
            }
            None => Ok(detect_local().unwrap_or_default()),
        }
    }

    pub fn gateway_settings(&self) -> Result<GatewaySettings> {
        let default_auth = self
            .registry
            .as_ref()
            .map(RegistryConfig::resolve)
            .transpose()?;
        Ok(GatewaySettings {
            timeout: self.engine.timeout,
            log_lines: self.limits.log_lines,
            attach_lines: self.limits.attach_lines,
            default_auth,
        })
    }
}
