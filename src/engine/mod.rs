// ABOUTME: Container engine access: capability traits, endpoint handling, and the bollard client.
// ABOUTME: The gateway depends only on the traits so tests can substitute a scripted engine.

mod bollard;
mod endpoint;
mod error;
mod raw;
mod traits;
pub mod wire;

pub use self::bollard::BollardEngine;
pub use endpoint::{DOCKER_SOCKET, Endpoint, detect_local};
pub use error::{ConnectError, ConnectErrorKind, EngineError};
pub use traits::*;
