// ABOUTME: Names of every lifecycle operation the gateway can dispatch.
// ABOUTME: Parses request routes (scope + action) into an Operation.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Info,
    DiskUsage,
    ImageList,
    ImageSearch,
    ImagePull,
    ImageInspect,
    ImageRemove,
    ImageTag,
    ImagePush,
    ImageSave,
    ImageLoad,
    ContainerList,
    ContainerCreate,
    ContainerStart,
    ContainerStop,
    ContainerRestart,
    ContainerRemove,
    ContainerPorts,
    ContainerCommit,
    ContainerExec,
    ContainerAttach,
    ContainerLogs,
    ContainerTop,
    ContainerStats,
    ContainerInspect,
}

impl Operation {
    pub const ALL: [Operation; 26] = [
        Operation::Login,
        Operation::Info,
        Operation::DiskUsage,
        Operation::ImageList,
        Operation::ImageSearch,
        Operation::ImagePull,
        Operation::ImageInspect,
        Operation::ImageRemove,
        Operation::ImageTag,
        Operation::ImagePush,
        Operation::ImageSave,
        Operation::ImageLoad,
        Operation::ContainerList,
        Operation::ContainerCreate,
        Operation::ContainerStart,
        Operation::ContainerStop,
        Operation::ContainerRestart,
        Operation::ContainerRemove,
        Operation::ContainerPorts,
        Operation::ContainerCommit,
        Operation::ContainerExec,
        Operation::ContainerAttach,
        Operation::ContainerLogs,
        Operation::ContainerTop,
        Operation::ContainerStats,
        Operation::ContainerInspect,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::Info => "info",
            Operation::DiskUsage => "disk_usage",
            Operation::ImageList => "image_list",
            Operation::ImageSearch => "image_search",
            Operation::ImagePull => "image_pull",
            Operation::ImageInspect => "image_inspect",
            Operation::ImageRemove => "image_remove",
            Operation::ImageTag => "image_tag",
            Operation::ImagePush => "image_push",
            Operation::ImageSave => "image_save",
            Operation::ImageLoad => "image_load",
            Operation::ContainerList => "container_list",
            Operation::ContainerCreate => "container_create",
            Operation::ContainerStart => "container_start",
            Operation::ContainerStop => "container_stop",
            Operation::ContainerRestart => "container_restart",
            Operation::ContainerRemove => "container_remove",
            Operation::ContainerPorts => "container_ports",
            Operation::ContainerCommit => "container_commit",
            Operation::ContainerExec => "container_exec",
            Operation::ContainerAttach => "container_attach",
            Operation::ContainerLogs => "container_logs",
            Operation::ContainerTop => "container_top",
            Operation::ContainerStats => "container_stats",
            Operation::ContainerInspect => "container_inspect",
        }
    }

    /// Resolve `/image/<action>` and `/container/<action>` routes.
    pub fn from_route(scope: &str, action: &str) -> Option<Self> {
        let op = match (scope, action) {
            ("image", "search") => Operation::ImageSearch,
            ("image", "pull") => Operation::ImagePull,
            ("image", "inspect") => Operation::ImageInspect,
            ("image", "remove") => Operation::ImageRemove,
            ("image", "tag") => Operation::ImageTag,
            ("image", "push") => Operation::ImagePush,
            ("image", "save") => Operation::ImageSave,
            ("image", "load") => Operation::ImageLoad,
            ("container", "create") => Operation::ContainerCreate,
            ("container", "start") => Operation::ContainerStart,
            ("container", "stop") => Operation::ContainerStop,
            ("container", "restart") => Operation::ContainerRestart,
            ("container", "remove") => Operation::ContainerRemove,
            ("container", "port") | ("container", "ports") => Operation::ContainerPorts,
            ("container", "commit") => Operation::ContainerCommit,
            ("container", "exec") => Operation::ContainerExec,
            ("container", "attach") => Operation::ContainerAttach,
            ("container", "logs") => Operation::ContainerLogs,
            ("container", "top") => Operation::ContainerTop,
            ("container", "stats") => Operation::ContainerStats,
            ("container", "inspect") => Operation::ContainerInspect,
            _ => return None,
        };
        Some(op)
    }

    /// Whether the operation changes engine state.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Operation::ImagePull
                | Operation::ImageRemove
                | Operation::ImageTag
                | Operation::ImagePush
                | Operation::ImageLoad
                | Operation::ContainerCreate
                | Operation::ContainerStart
                | Operation::ContainerStop
                | Operation::ContainerRestart
                | Operation::ContainerRemove
                | Operation::ContainerCommit
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}
