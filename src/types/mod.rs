// ABOUTME: Type-safe identifiers and opaque image references.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;
mod image_ref;

pub use id::{ContainerId, ExecId, Id, IdError, IdKind};
pub use image_ref::{ImageRef, ParseImageRefError};
