// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Writes a commented berth.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

/// Write `berth.yml` into `dir`, refusing to overwrite unless `force`.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    Ok(config_path)
}

pub(super) const TEMPLATE: &str = r#"# berth control plane configuration
listen: 127.0.0.1:5000

engine:
  # unix:///path/to.sock, tcp://host:port or http://host:port.
  # Leave unset to use DOCKER_HOST or the first local Podman/Docker socket.
  # endpoint: unix:///var/run/docker.sock
  timeout: 60s
  connect_timeout: 120s

limits:
  log_lines: 1000
  attach_lines: 1000

logging:
  level: info

# Default registry credentials for pull and push.
# registry:
#   username: deploy
#   password:
#     env: BERTH_REGISTRY_PASSWORD
#   server: registry.example.com
"#;
