// ABOUTME: Image operations trait for the container engine.
// ABOUTME: List, search, pull, inspect, remove, tag, push, export, and import images.

use super::super::error::EngineError;
use super::shared_types::{EngineStream, ImportRequest, RegistryAuth};
use crate::types::ImageRef;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

/// Image lifecycle operations.
///
/// Long transfers (`pull_image`, `push_image`, `export_image`) return a
/// stream; nothing happens on the engine until it is polled.
#[async_trait]
pub trait ImageOps: Send + Sync {
    async fn list_images(&self) -> Result<Vec<Value>, EngineError>;

    /// Search the public registry.
    async fn search_images(&self, term: &str) -> Result<Vec<Value>, EngineError>;

    /// Pull `image:tag`, yielding progress objects.
    fn pull_image(
        &self,
        image: &ImageRef,
        tag: &str,
        auth: Option<&RegistryAuth>,
    ) -> EngineStream<Value>;

    async fn inspect_image(&self, image: &ImageRef) -> Result<Value, EngineError>;

    /// Remove an image, returning the untagged and deleted entries.
    async fn remove_image(&self, image: &ImageRef, force: bool) -> Result<Value, EngineError>;

    async fn tag_image(
        &self,
        image: &ImageRef,
        repository: &str,
        tag: Option<&str>,
    ) -> Result<(), EngineError>;

    /// Push `repository[:tag]`, yielding progress objects.
    fn push_image(
        &self,
        repository: &str,
        tag: Option<&str>,
        auth: Option<&RegistryAuth>,
    ) -> EngineStream<Value>;

    /// Export an image as tarball chunks.
    fn export_image(&self, image: &ImageRef) -> EngineStream<Bytes>;

    /// Create an image from a filesystem tarball.
    async fn import_image(&self, request: ImportRequest) -> Result<Value, EngineError>;
}
