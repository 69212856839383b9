// ABOUTME: Engine gateway exposing one async operation per lifecycle action.
// ABOUTME: Bounds every engine round trip, classifies failures, and caches registry logins.

mod operation;

pub use operation::{Operation, UnknownOperation};

use crate::engine::{
    CreatedContainer, Engine, EngineError, EngineStream, ExecOutput, ImportRequest, OutputChunk,
    RegistryAuth,
};
use crate::filter::filter_by_keyword;
use crate::outcome::{
    Failure, FailureKind, LifecycleResult, classify, classify_pull, tolerate_not_modified,
};
use crate::params::{
    CommitOptions, ContainerCreateOptions, ContainerTarget, ExecOptions, ImageTarget,
    ListContainersOptions, LoadOptions, LoginOptions, PullOptions, PushOptions, RawParameters,
    RemoveContainerOptions, RemoveImageOptions, SaveOptions, SearchOptions, StopOptions,
    TagOptions,
};
use crate::types::{ContainerId, ImageRef};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Read size for tarballs streamed to the engine.
const IMPORT_CHUNK_SIZE: usize = 64 * 1024;

/// Fields the image keyword filter scans.
pub const IMAGE_FILTER_FIELDS: &[&str] = &["RepoTags", "Id"];

/// Tunables fixed at construction.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Bound on each engine round trip, and on the gap between stream chunks.
    pub timeout: Duration,
    /// Newest log lines returned by `container_logs`.
    pub log_lines: usize,
    /// Lines returned by `container_attach`.
    pub attach_lines: usize,
    /// Credentials used when a request carries none and nobody logged in.
    pub default_auth: Option<RegistryAuth>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            log_lines: 1000,
            attach_lines: 1000,
            default_auth: None,
        }
    }
}

/// The single owner of the engine handle.
///
/// Cloning is cheap and every clone shares the same engine and login cache,
/// so one gateway can serve concurrent requests.
pub struct Gateway<E> {
    engine: Arc<E>,
    settings: Arc<GatewaySettings>,
    session: Arc<RwLock<Option<RegistryAuth>>>,
}

impl<E> Clone for Gateway<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            settings: Arc::clone(&self.settings),
            session: Arc::clone(&self.session),
        }
    }
}

impl<E: Engine> Gateway<E> {
    pub fn new(engine: E, settings: GatewaySettings) -> Self {
        Self::from_shared(Arc::new(engine), settings)
    }

    pub fn from_shared(engine: Arc<E>, settings: GatewaySettings) -> Self {
        Self {
            engine,
            settings: Arc::new(settings),
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Normalize `raw` for `op` and run it.
    ///
    /// Parameter failures return before the engine is touched.
    pub async fn dispatch(&self, op: Operation, raw: &RawParameters) -> LifecycleResult<Value> {
        tracing::debug!(operation = %op, "dispatching");
        match op {
            Operation::Login => self.login(&LoginOptions::try_from(raw)?).await,
            Operation::Info => self.info().await,
            Operation::DiskUsage => self.disk_usage().await,
            Operation::ImageList => payload(self.list_images().await?),
            Operation::ImageSearch => {
                payload(self.search_images(&SearchOptions::try_from(raw)?).await?)
            }
            Operation::ImagePull => self.pull_image(&PullOptions::try_from(raw)?).await,
            Operation::ImageInspect => self.inspect_image(&ImageTarget::try_from(raw)?).await,
            Operation::ImageRemove => {
                self.remove_image(&RemoveImageOptions::try_from(raw)?).await
            }
            Operation::ImageTag => payload(self.tag_image(&TagOptions::try_from(raw)?).await?),
            Operation::ImagePush => self.push_image(&PushOptions::try_from(raw)?).await,
            Operation::ImageSave => self.save_image(&SaveOptions::try_from(raw)?).await,
            Operation::ImageLoad => self.load_image(&LoadOptions::try_from(raw)?).await,
            Operation::ContainerList => {
                payload(self.list_containers(&ListContainersOptions::try_from(raw)?).await?)
            }
            Operation::ContainerCreate => {
                payload(self.create_container(&ContainerCreateOptions::try_from(raw)?).await?)
            }
            Operation::ContainerStart => {
                self.start_container(&ContainerTarget::try_from(raw)?).await
            }
            Operation::ContainerStop => self.stop_container(&StopOptions::try_from(raw)?).await,
            Operation::ContainerRestart => {
                self.restart_container(&StopOptions::try_from(raw)?).await
            }
            Operation::ContainerRemove => {
                self.remove_container(&RemoveContainerOptions::try_from(raw)?).await
            }
            Operation::ContainerPorts => {
                self.container_ports(&ContainerTarget::try_from(raw)?).await
            }
            Operation::ContainerCommit => {
                self.commit_container(&CommitOptions::try_from(raw)?).await
            }
            Operation::ContainerExec => payload(self.exec(&ExecOptions::try_from(raw)?).await?),
            Operation::ContainerAttach => {
                payload(self.attach(&ContainerTarget::try_from(raw)?).await?)
            }
            Operation::ContainerLogs => {
                payload(self.logs(&ContainerTarget::try_from(raw)?).await?)
            }
            Operation::ContainerTop => self.top(&ContainerTarget::try_from(raw)?).await,
            Operation::ContainerStats => self.stats(&ContainerTarget::try_from(raw)?).await,
            Operation::ContainerInspect => {
                self.inspect_container(&ContainerTarget::try_from(raw)?).await
            }
        }
    }

    // System

    /// Check credentials with the registry and remember them for later
    /// pulls and pushes.
    pub async fn login(&self, options: &LoginOptions) -> LifecycleResult<Value> {
        let auth = &options.auth;
        tracing::debug!(user = %auth.username, server = ?auth.server, "registry login");
        let reply = self
            .round_trip(self.engine.login(auth))
            .await
            .map_err(classify)?;
        *self.session.write() = Some(auth.clone());
        tracing::info!(user = %auth.username, server = ?auth.server, "logged in to registry");
        Ok(reply)
    }

    pub async fn info(&self) -> LifecycleResult<Value> {
        self.round_trip(self.engine.info()).await.map_err(classify)
    }

    pub async fn disk_usage(&self) -> LifecycleResult<Value> {
        self.round_trip(self.engine.disk_usage())
            .await
            .map_err(classify)
    }

    // Images

    pub async fn list_images(&self) -> LifecycleResult<Vec<Value>> {
        self.round_trip(self.engine.list_images())
            .await
            .map_err(classify)
    }

    /// Images whose tags or id contain `keyword`.
    pub async fn list_images_matching(&self, keyword: &str) -> LifecycleResult<Vec<Value>> {
        let images = self.list_images().await?;
        Ok(filter_by_keyword(&images, IMAGE_FILTER_FIELDS, keyword))
    }

    pub async fn search_images(&self, options: &SearchOptions) -> LifecycleResult<Vec<Value>> {
        tracing::debug!(term = %options.term, "searching registry");
        self.round_trip(self.engine.search_images(&options.term))
            .await
            .map_err(classify)
    }

    pub async fn pull_image(&self, options: &PullOptions) -> LifecycleResult<Value> {
        tracing::debug!(image = %options.image, tag = %options.tag, "pulling image");
        let auth = self.credentials(None);
        let stream = self
            .engine
            .pull_image(&options.image, &options.tag, auth.as_ref());
        let status = self.last_status(stream).await.map_err(classify_pull)?;
        tracing::info!(image = %options.image, tag = %options.tag, "pulled image");
        Ok(json!({
            "image": options.image.as_str(),
            "tag": options.tag,
            "status": status,
        }))
    }

    pub async fn inspect_image(&self, target: &ImageTarget) -> LifecycleResult<Value> {
        tracing::debug!(image = %target.image, "inspecting image");
        self.round_trip(self.engine.inspect_image(&target.image))
            .await
            .map_err(classify)
    }

    pub async fn remove_image(&self, options: &RemoveImageOptions) -> LifecycleResult<Value> {
        tracing::debug!(image = %options.image, force = options.force, "removing image");
        let reply = self
            .round_trip(self.engine.remove_image(&options.image, options.force))
            .await
            .map_err(classify)?;
        tracing::info!(image = %options.image, "removed image");
        Ok(reply)
    }

    /// Returns `true` once the engine has applied the tag.
    pub async fn tag_image(&self, options: &TagOptions) -> LifecycleResult<bool> {
        tracing::debug!(
            image = %options.image,
            repository = %options.repository,
            tag = ?options.tag,
            "tagging image"
        );
        self.round_trip(self.engine.tag_image(
            &options.image,
            &options.repository,
            options.tag.as_deref(),
        ))
        .await
        .map_err(classify)?;
        tracing::info!(image = %options.image, repository = %options.repository, "tagged image");
        Ok(true)
    }

    pub async fn push_image(&self, options: &PushOptions) -> LifecycleResult<Value> {
        tracing::debug!(repository = %options.repository, tag = ?options.tag, "pushing image");
        let auth = self.credentials(options.auth.as_ref());
        let stream = self.engine.push_image(
            &options.repository,
            options.tag.as_deref(),
            auth.as_ref(),
        );
        let status = self.last_status(stream).await.map_err(classify)?;
        tracing::info!(repository = %options.repository, "pushed image");
        Ok(json!({
            "repository": options.repository,
            "tag": options.tag,
            "status": status,
        }))
    }

    /// Stream the image export into `save_path/tarball_name`.
    ///
    /// A partially written file is removed when the export fails.
    pub async fn save_image(&self, options: &SaveOptions) -> LifecycleResult<Value> {
        let path = options.path();
        tracing::debug!(image = %options.image, path = %path.display(), "saving image");
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| classify(EngineError::Io(e)))?;

        let written = self.write_export(&options.image, &mut file).await;
        drop(file);
        let bytes = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("could not remove partial tarball: {}", cleanup);
                }
                return Err(classify(e));
            }
        };

        let shown = path.display().to_string();
        tracing::info!(image = %options.image, bytes, "saved image");
        Ok(json!({
            "message": format!("Image {} saved at {}", options.image, shown),
            "path": shown,
            "status": "succeed",
        }))
    }

    /// Import the tarball at `tarball_name` as `image_name[:image_tag]`.
    pub async fn load_image(&self, options: &LoadOptions) -> LifecycleResult<Value> {
        tracing::debug!(
            tarball = %options.tarball.display(),
            repository = %options.repository,
            "loading image"
        );
        let file = tokio::fs::File::open(&options.tarball)
            .await
            .map_err(|e| classify(EngineError::Io(e)))?;
        let request = ImportRequest {
            archive: file_chunks(file),
            repository: options.repository.clone(),
            tag: options.tag.clone(),
            changes: options.changes.clone(),
        };
        let reply = self
            .round_trip(self.engine.import_image(request))
            .await
            .map_err(classify)?;
        tracing::info!(repository = %options.repository, tag = ?options.tag, "loaded image");
        Ok(reply)
    }

    // Containers

    pub async fn list_containers(
        &self,
        options: &ListContainersOptions,
    ) -> LifecycleResult<Vec<Value>> {
        self.round_trip(self.engine.list_containers(options.all))
            .await
            .map_err(classify)
    }

    pub async fn create_container(
        &self,
        options: &ContainerCreateOptions,
    ) -> LifecycleResult<CreatedContainer> {
        tracing::debug!(image = %options.image, name = ?options.name, "creating container");
        let created = self
            .round_trip(self.engine.create_container(options))
            .await
            .map_err(classify)?;
        for warning in &created.warnings {
            tracing::warn!(container = %created.id, "engine warning: {}", warning);
        }
        tracing::info!(container = %created.id, name = ?options.name, "created container");
        Ok(created)
    }

    pub async fn start_container(&self, target: &ContainerTarget) -> LifecycleResult<Value> {
        let id = &target.id;
        tracing::debug!(container = %id, "starting container");
        self.round_trip(async { tolerate_not_modified(self.engine.start_container(id).await) })
            .await
            .map_err(classify)?;
        tracing::info!(container = %id, "started container");
        Ok(state_reply(id, "started"))
    }

    pub async fn stop_container(&self, options: &StopOptions) -> LifecycleResult<Value> {
        let id = &options.id;
        tracing::debug!(container = %id, timeout = ?options.timeout, "stopping container");
        let stop = async {
            tolerate_not_modified(self.engine.stop_container(id, options.timeout).await)
        };
        self.round_trip_with_grace(stop, options.timeout)
            .await
            .map_err(classify)?;
        tracing::info!(container = %id, "stopped container");
        Ok(state_reply(id, "stopped"))
    }

    pub async fn restart_container(&self, options: &StopOptions) -> LifecycleResult<Value> {
        let id = &options.id;
        tracing::debug!(container = %id, timeout = ?options.timeout, "restarting container");
        let restart = async {
            tolerate_not_modified(self.engine.restart_container(id, options.timeout).await)
        };
        self.round_trip_with_grace(restart, options.timeout)
            .await
            .map_err(classify)?;
        tracing::info!(container = %id, "restarted container");
        Ok(state_reply(id, "restarted"))
    }

    pub async fn remove_container(
        &self,
        options: &RemoveContainerOptions,
    ) -> LifecycleResult<Value> {
        let id = &options.id;
        tracing::debug!(container = %id, force = options.force, "removing container");
        self.round_trip(self.engine.remove_container(id, options.force))
            .await
            .map_err(classify)?;
        tracing::info!(container = %id, "removed container");
        Ok(state_reply(id, "removed"))
    }

    /// The container's published port map.
    pub async fn container_ports(&self, target: &ContainerTarget) -> LifecycleResult<Value> {
        let details = self.inspect_container(target).await?;
        Ok(details
            .pointer("/NetworkSettings/Ports")
            .filter(|ports| !ports.is_null())
            .cloned()
            .unwrap_or_else(|| json!({})))
    }

    pub async fn commit_container(&self, options: &CommitOptions) -> LifecycleResult<Value> {
        tracing::debug!(
            container = %options.id,
            repository = %options.repository,
            tag = ?options.tag,
            "committing container"
        );
        let reply = self
            .round_trip(self.engine.commit_container(options))
            .await
            .map_err(classify)?;
        tracing::info!(container = %options.id, repository = %options.repository, "committed container");
        Ok(reply)
    }

    pub async fn exec(&self, options: &ExecOptions) -> LifecycleResult<ExecOutput> {
        tracing::debug!(container = %options.id, cmd = ?options.cmd, "exec");
        self.round_trip(self.engine.exec(&options.id, &options.cmd))
            .await
            .map_err(classify)
    }

    /// Output captured so far, without following. At most
    /// `attach_lines` lines, newest kept.
    pub async fn attach(&self, target: &ContainerTarget) -> LifecycleResult<Vec<String>> {
        tracing::debug!(container = %target.id, "attaching");
        let stream = self
            .round_trip(self.engine.attach(&target.id))
            .await
            .map_err(classify)?;
        self.collect_lines(stream, self.settings.attach_lines)
            .await
            .map_err(classify)
    }

    /// The newest `log_lines` log lines in order.
    pub async fn logs(&self, target: &ContainerTarget) -> LifecycleResult<Vec<String>> {
        tracing::debug!(container = %target.id, tail = self.settings.log_lines, "reading logs");
        let stream = self.engine.logs(&target.id, self.settings.log_lines);
        self.collect_lines(stream, self.settings.log_lines)
            .await
            .map_err(classify)
    }

    pub async fn top(&self, target: &ContainerTarget) -> LifecycleResult<Value> {
        self.round_trip(self.engine.top_processes(&target.id))
            .await
            .map_err(classify)
    }

    /// One resource-usage snapshot.
    pub async fn stats(&self, target: &ContainerTarget) -> LifecycleResult<Value> {
        self.round_trip(self.engine.stats_snapshot(&target.id))
            .await
            .map_err(classify)
    }

    pub async fn inspect_container(&self, target: &ContainerTarget) -> LifecycleResult<Value> {
        tracing::debug!(container = %target.id, "inspecting container");
        self.round_trip(self.engine.inspect_container(&target.id))
            .await
            .map_err(classify)
    }

    // Plumbing

    /// Explicit credentials, then the cached login, then the configured default.
    fn credentials(&self, explicit: Option<&RegistryAuth>) -> Option<RegistryAuth> {
        explicit
            .cloned()
            .or_else(|| self.session.read().clone())
            .or_else(|| self.settings.default_auth.clone())
    }

    async fn round_trip<T, F>(&self, call: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        bounded(self.settings.timeout, call).await
    }

    /// Stop and restart may legitimately wait out the grace period first.
    async fn round_trip_with_grace<T, F>(
        &self,
        call: F,
        grace_secs: Option<i64>,
    ) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        let grace = grace_secs
            .and_then(|s| u64::try_from(s).ok())
            .map(Duration::from_secs)
            .unwrap_or_default();
        bounded(self.settings.timeout + grace, call).await
    }

    /// Next stream item, failing if the engine stays silent for a full timeout.
    async fn next_within<T>(&self, stream: &mut EngineStream<T>) -> Result<Option<T>, EngineError> {
        match tokio::time::timeout(self.settings.timeout, stream.next()).await {
            Ok(item) => item.transpose(),
            Err(_) => Err(EngineError::Timeout(self.settings.timeout)),
        }
    }

    /// Drain a progress stream, keeping the last `status` line.
    async fn last_status(&self, mut stream: EngineStream<Value>) -> Result<Option<String>, EngineError> {
        let mut status = None;
        while let Some(progress) = self.next_within(&mut stream).await? {
            if let Some(line) = progress.get("status").and_then(Value::as_str) {
                status = Some(line.to_string());
            }
        }
        Ok(status)
    }

    async fn write_export(
        &self,
        image: &ImageRef,
        file: &mut tokio::fs::File,
    ) -> Result<u64, EngineError> {
        let mut stream = self.engine.export_image(image);
        let mut written = 0u64;
        while let Some(chunk) = self.next_within(&mut stream).await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn collect_lines(
        &self,
        mut stream: EngineStream<OutputChunk>,
        limit: usize,
    ) -> Result<Vec<String>, EngineError> {
        let mut text = String::new();
        while let Some(chunk) = self.next_within(&mut stream).await? {
            text.push_str(&chunk.content);
        }
        Ok(newest_lines(&text, limit))
    }
}

/// A file as a stream of chunks, ending at EOF.
fn file_chunks(file: tokio::fs::File) -> EngineStream<Bytes> {
    Box::pin(futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = BytesMut::with_capacity(IMPORT_CHUNK_SIZE);
        let read = file.read_buf(&mut buf).await?;
        Ok::<_, EngineError>((read > 0).then(|| (buf.freeze(), file)))
    }))
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(EngineError::Timeout(limit)))
}

fn state_reply(id: &ContainerId, status: &str) -> Value {
    json!({ "Id": id.as_str(), "status": status })
}

fn payload<T: Serialize>(value: T) -> LifecycleResult<Value> {
    serde_json::to_value(value).map_err(|e| Failure::new(FailureKind::Internal, e.to_string()))
}

/// Split on newlines and keep the last `limit` lines.
fn newest_lines(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let lines: Vec<&str> = text.strip_suffix('\n').unwrap_or(text).split('\n').collect();
    let skip = lines.len().saturating_sub(limit);
    lines[skip..]
        .iter()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}
