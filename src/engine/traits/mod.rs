// ABOUTME: Composable capability traits for the container engine.
// ABOUTME: Defines SystemOps, ImageOps, ContainerOps, StreamOps and the Engine umbrella.

mod container;
mod image;
mod shared_types;
mod stream;
mod system;

pub use container::ContainerOps;
pub use image::ImageOps;
pub use shared_types::*;
pub use stream::StreamOps;
pub use system::SystemOps;

/// Everything the gateway needs from an engine.
pub trait Engine: SystemOps + ImageOps + ContainerOps + StreamOps + 'static {}

impl<T> Engine for T where T: SystemOps + ImageOps + ContainerOps + StreamOps + 'static {}
