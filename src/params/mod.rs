// ABOUTME: Option normalizer turning raw request fields into typed option bags.
// ABOUTME: Every failure here is an InvalidParameters result; no engine call happens.

pub(crate) mod de;
mod container;
mod error;
mod host_config;
mod image;
mod networking;
mod raw;
mod restart_policy;

pub use container::{
    CommitOptions, ContainerCreateOptions, ContainerTarget, ExecOptions, HealthcheckOptions,
    ListContainersOptions, RemoveContainerOptions, StopOptions,
};
pub use de::PortBindingSpec;
pub use error::ParamError;
pub use host_config::{
    HostConfigOptions, LogConfigOptions, MountKind, MountOptions, ThrottleDeviceOptions,
    UlimitOptions, WeightDeviceOptions,
};
pub use image::{
    DEFAULT_TAG, ImageTarget, LoadOptions, LoginOptions, PullOptions, PushOptions,
    RemoveImageOptions, SaveOptions, SearchOptions, TagOptions,
};
pub use networking::{EndpointConfigOptions, NetworkConfigOptions};
pub use raw::{Flag, KNOWN_PARAMETERS, RawParameters};
pub use restart_policy::RestartPolicy;
