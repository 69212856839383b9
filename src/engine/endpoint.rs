// ABOUTME: Engine endpoint parsing and local socket detection.
// ABOUTME: Checks DOCKER_HOST, then Podman sockets, then the Docker socket.

use std::fmt;
use std::path::{Path, PathBuf};

pub const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DEFAULT_TCP_PORT: u16 = 2375;

/// Where the engine API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    /// Accepts `unix:///path`, a bare absolute path, `tcp://host:port` and
    /// `http://host:port`.
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("endpoint cannot be empty".to_string());
        }

        if let Some(path) = input.strip_prefix("unix://") {
            return unix_path(path);
        }
        if input.starts_with('/') {
            return unix_path(input);
        }

        let rest = input
            .strip_prefix("tcp://")
            .or_else(|| input.strip_prefix("http://"))
            .ok_or_else(|| format!("unsupported scheme in '{}'", input))?;
        let authority = rest.trim_end_matches('/');
        if authority.is_empty() || authority.contains('/') {
            return Err(format!("expected host[:port], got '{}'", rest));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) if !host.ends_with(':') => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port '{}'", port))?;
                (host, port)
            }
            _ => (authority, DEFAULT_TCP_PORT),
        };
        if host.is_empty() {
            return Err("host cannot be empty".to_string());
        }
        Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        })
    }

    /// `http://host:port` form used by the HTTP client.
    pub fn http_url(&self) -> Option<String> {
        match self {
            Endpoint::Tcp { host, port } => Some(format!("http://{}:{}", host, port)),
            Endpoint::Unix(_) => None,
        }
    }
}

fn unix_path(path: &str) -> Result<Endpoint, String> {
    if path.is_empty() || !path.starts_with('/') {
        return Err(format!("socket path must be absolute, got '{}'", path));
    }
    Ok(Endpoint::Unix(PathBuf::from(path)))
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Unix(PathBuf::from(DOCKER_SOCKET))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
        }
    }
}

/// Detect an engine endpoint on the local system.
///
/// Detection order:
/// 1. `DOCKER_HOST`
/// 2. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 3. Rootful Podman socket (`/run/podman/podman.sock`)
/// 4. Docker socket (`/var/run/docker.sock`)
pub fn detect_local() -> Option<Endpoint> {
    if let Ok(host) = std::env::var("DOCKER_HOST")
        && let Ok(endpoint) = Endpoint::parse(&host)
    {
        return Some(endpoint);
    }

    if let Some(uid) = get_uid() {
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if Path::new(&rootless_socket).exists() {
            return Some(Endpoint::Unix(PathBuf::from(rootless_socket)));
        }
    }

    [ROOTFUL_PODMAN, DOCKER_SOCKET]
        .into_iter()
        .find(|socket| Path::new(socket).exists())
        .map(|socket| Endpoint::Unix(PathBuf::from(socket)))
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}
