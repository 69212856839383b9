// ABOUTME: Scripted in-memory engine implementing the capability traits.
// ABOUTME: Records every call so tests can assert what reached the engine.

use async_trait::async_trait;
use berth::engine::{
    ContainerOps, CreatedContainer, EngineError, EngineStream, ExecOutput, ImageOps,
    ImportRequest, OutputChunk, RegistryAuth, StreamOps, SystemOps, wire,
};
use berth::params::{CommitOptions, ContainerCreateOptions};
use berth::types::{ContainerId, ImageRef};
use bytes::Bytes;
use futures::{TryStreamExt, stream};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;

/// Password the fake registry refuses.
pub const BAD_PASSWORD: &str = "wrong";

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: Option<String>,
    pub running: bool,
    /// The create request as it would go over the wire.
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub reference: String,
    pub tag: Option<String>,
    pub auth: Option<RegistryAuth>,
}

#[derive(Default)]
struct State {
    images: Vec<Value>,
    containers: BTreeMap<String, FakeContainer>,
    next_id: u64,
    calls: Vec<&'static str>,
    pulls: Vec<Transfer>,
    pushes: Vec<Transfer>,
    imports: Vec<(String, Option<String>, Option<String>, usize)>,
    logs: BTreeMap<String, String>,
}

/// An engine that keeps images and containers in memory.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<State>,
    delay: Option<Duration>,
    stall_streams: bool,
    broken_export: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image with one tag.
    pub fn with_image(self, tag: &str, id: &str) -> Self {
        self.state
            .lock()
            .images
            .push(json!({"Id": id, "RepoTags": [tag], "Size": 1024}));
        self
    }

    /// Every request-reply call sleeps this long first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Streams never yield.
    pub fn with_stalled_streams(mut self) -> Self {
        self.stall_streams = true;
        self
    }

    /// Exports fail after the first chunk.
    pub fn with_broken_export(mut self) -> Self {
        self.broken_export = true;
        self
    }

    pub fn set_logs(&self, id: &str, text: &str) {
        self.state.lock().logs.insert(id.to_string(), text.to_string());
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn pulls(&self) -> Vec<Transfer> {
        self.state.lock().pulls.clone()
    }

    pub fn pushes(&self) -> Vec<Transfer> {
        self.state.lock().pushes.clone()
    }

    pub fn imports(&self) -> Vec<(String, Option<String>, Option<String>, usize)> {
        self.state.lock().imports.clone()
    }

    pub fn images(&self) -> Vec<Value> {
        self.state.lock().images.clone()
    }

    pub fn containers(&self) -> Vec<FakeContainer> {
        self.state.lock().containers.values().cloned().collect()
    }

    pub fn container(&self, id: &str) -> Option<FakeContainer> {
        self.state.lock().containers.get(id).cloned()
    }

    fn record(&self, call: &'static str) {
        self.state.lock().calls.push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn find_image(state: &State, reference: &str) -> Option<usize> {
        let with_latest = format!("{}:latest", reference);
        state.images.iter().position(|image| {
            image["Id"] == reference
                || image["RepoTags"].as_array().is_some_and(|tags| {
                    tags.iter()
                        .any(|t| t == reference || t.as_str() == Some(with_latest.as_str()))
                })
        })
    }

    fn add_image(state: &mut State, tag: String) {
        let id = format!("sha256:{:04}", state.images.len() + 1);
        state.images.push(json!({"Id": id, "RepoTags": [tag], "Size": 2048}));
    }

    fn running(&self, id: &ContainerId) -> Result<bool, EngineError> {
        self.state
            .lock()
            .containers
            .get(id.as_str())
            .map(|c| c.running)
            .ok_or_else(|| no_such_container(id))
    }

    fn set_running(&self, id: &ContainerId, running: bool) {
        if let Some(container) = self.state.lock().containers.get_mut(id.as_str()) {
            container.running = running;
        }
    }

    fn progress(&self, lines: Vec<Result<Value, EngineError>>) -> EngineStream<Value> {
        if self.stall_streams {
            Box::pin(stream::pending::<Result<Value, EngineError>>())
        } else {
            Box::pin(stream::iter(lines))
        }
    }
}

fn no_such_container(id: &ContainerId) -> EngineError {
    EngineError::server(404, format!("No such container: {}", id))
}

fn no_such_image(reference: &str) -> EngineError {
    EngineError::server(404, format!("No such image: {}", reference))
}

/// Split text into small chunks that do not respect line boundaries.
fn chunked(text: &str) -> Vec<Result<OutputChunk, EngineError>> {
    text.as_bytes()
        .chunks(3)
        .map(|bytes| Ok(OutputChunk::stdout(String::from_utf8_lossy(bytes))))
        .collect()
}

#[async_trait]
impl SystemOps for FakeEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.record("ping");
        Ok(())
    }

    async fn info(&self) -> Result<Value, EngineError> {
        self.record("info");
        self.pause().await;
        let state = self.state.lock();
        Ok(json!({
            "ServerVersion": "fake-1.0",
            "Containers": state.containers.len(),
            "Images": state.images.len(),
        }))
    }

    async fn disk_usage(&self) -> Result<Value, EngineError> {
        self.record("disk_usage");
        self.pause().await;
        let state = self.state.lock();
        Ok(json!({
            "LayersSize": 0,
            "Images": state.images,
            "Containers": [],
            "Volumes": [],
        }))
    }

    async fn login(&self, auth: &RegistryAuth) -> Result<Value, EngineError> {
        self.record("login");
        self.pause().await;
        if auth.password == BAD_PASSWORD {
            return Err(EngineError::server(401, "unauthorized: incorrect username or password"));
        }
        Ok(json!({"Status": "Login Succeeded"}))
    }
}

#[async_trait]
impl ImageOps for FakeEngine {
    async fn list_images(&self) -> Result<Vec<Value>, EngineError> {
        self.record("list_images");
        self.pause().await;
        Ok(self.state.lock().images.clone())
    }

    async fn search_images(&self, term: &str) -> Result<Vec<Value>, EngineError> {
        self.record("search_images");
        self.pause().await;
        Ok(vec![json!({"name": term, "star_count": 1, "is_official": false})])
    }

    fn pull_image(
        &self,
        image: &ImageRef,
        tag: &str,
        auth: Option<&RegistryAuth>,
    ) -> EngineStream<Value> {
        self.record("pull_image");
        let reference = image.as_str().to_string();
        {
            let mut state = self.state.lock();
            state.pulls.push(Transfer {
                reference: reference.clone(),
                tag: Some(tag.to_string()),
                auth: auth.cloned(),
            });
            if !reference.starts_with("ghost") && !self.stall_streams {
                Self::add_image(&mut state, format!("{}:{}", reference, tag));
            }
        }
        if reference.starts_with("ghost") {
            return self.progress(vec![
                Ok(json!({"status": format!("Pulling from library/{}", reference)})),
                Err(EngineError::Stream(format!(
                    "manifest for {}:{} not found: manifest unknown",
                    reference, tag
                ))),
            ]);
        }
        self.progress(vec![
            Ok(json!({"status": format!("Pulling from library/{}", reference)})),
            Ok(json!({"status": "Download complete", "id": "abc"})),
            Ok(json!({"status": format!("Downloaded newer image for {}:{}", reference, tag)})),
        ])
    }

    async fn inspect_image(&self, image: &ImageRef) -> Result<Value, EngineError> {
        self.record("inspect_image");
        self.pause().await;
        let state = self.state.lock();
        Self::find_image(&state, image.as_str())
            .map(|i| state.images[i].clone())
            .ok_or_else(|| no_such_image(image.as_str()))
    }

    async fn remove_image(&self, image: &ImageRef, _force: bool) -> Result<Value, EngineError> {
        self.record("remove_image");
        self.pause().await;
        let mut state = self.state.lock();
        let index =
            Self::find_image(&state, image.as_str()).ok_or_else(|| no_such_image(image.as_str()))?;
        let removed = state.images.remove(index);
        Ok(json!([{"Deleted": removed["Id"]}]))
    }

    async fn tag_image(
        &self,
        image: &ImageRef,
        repository: &str,
        tag: Option<&str>,
    ) -> Result<(), EngineError> {
        self.record("tag_image");
        self.pause().await;
        let mut state = self.state.lock();
        let index =
            Self::find_image(&state, image.as_str()).ok_or_else(|| no_such_image(image.as_str()))?;
        let new_tag = format!("{}:{}", repository, tag.unwrap_or("latest"));
        if let Some(tags) = state.images[index]["RepoTags"].as_array_mut() {
            tags.push(Value::String(new_tag));
        }
        Ok(())
    }

    fn push_image(
        &self,
        repository: &str,
        tag: Option<&str>,
        auth: Option<&RegistryAuth>,
    ) -> EngineStream<Value> {
        self.record("push_image");
        self.state.lock().pushes.push(Transfer {
            reference: repository.to_string(),
            tag: tag.map(str::to_string),
            auth: auth.cloned(),
        });
        self.progress(vec![
            Ok(json!({"status": format!("The push refers to repository [{}]", repository)})),
            Ok(json!({"status": "Pushed", "id": "abc"})),
            Ok(json!({"status": format!("{}: digest: sha256:feed size: 528", tag.unwrap_or("latest"))})),
        ])
    }

    fn export_image(&self, image: &ImageRef) -> EngineStream<Bytes> {
        self.record("export_image");
        if self.stall_streams {
            return Box::pin(stream::pending::<Result<Bytes, EngineError>>());
        }
        let found = Self::find_image(&self.state.lock(), image.as_str()).is_some();
        if !found {
            return Box::pin(stream::iter(vec![Err(no_such_image(image.as_str()))]));
        }
        let mut chunks = vec![Ok(Bytes::from_static(b"fake-tar-header;"))];
        if self.broken_export {
            chunks.push(Err(EngineError::Stream("unexpected EOF".to_string())));
        } else {
            chunks.push(Ok(Bytes::from_static(b"fake-tar-body")));
        }
        Box::pin(stream::iter(chunks))
    }

    async fn import_image(&self, request: ImportRequest) -> Result<Value, EngineError> {
        self.record("import_image");
        self.pause().await;
        let archive_len = request
            .archive
            .try_fold(0usize, |len, chunk| async move { Ok(len + chunk.len()) })
            .await?;
        let mut state = self.state.lock();
        let tag = format!(
            "{}:{}",
            request.repository,
            request.tag.as_deref().unwrap_or("latest")
        );
        Self::add_image(&mut state, tag);
        state.imports.push((
            request.repository,
            request.tag,
            request.changes,
            archive_len,
        ));
        Ok(json!({"status": "sha256:imported"}))
    }
}

#[async_trait]
impl ContainerOps for FakeEngine {
    async fn list_containers(&self, all: bool) -> Result<Vec<Value>, EngineError> {
        self.record("list_containers");
        self.pause().await;
        Ok(self
            .state
            .lock()
            .containers
            .values()
            .filter(|c| all || c.running)
            .map(|c| {
                let names: Vec<String> = c.name.iter().map(|n| format!("/{}", n)).collect();
                let status = if c.running { "running" } else { "created" };
                json!({"Id": c.id, "Names": names, "State": status})
            })
            .collect())
    }

    async fn create_container(
        &self,
        options: &ContainerCreateOptions,
    ) -> Result<CreatedContainer, EngineError> {
        self.record("create_container");
        self.pause().await;
        let mut state = self.state.lock();
        if Self::find_image(&state, options.image.as_str()).is_none() {
            return Err(no_such_image(options.image.as_str()));
        }
        if let Some(name) = &options.name
            && state.containers.values().any(|c| c.name.as_ref() == Some(name))
        {
            return Err(EngineError::server(
                409,
                format!(
                    "Conflict. The container name \"/{}\" is already in use",
                    name
                ),
            ));
        }
        state.next_id += 1;
        let id = format!("c{:011}", state.next_id);
        state.containers.insert(
            id.clone(),
            FakeContainer {
                id: id.clone(),
                name: options.name.clone(),
                running: false,
                config: wire::container_create_body(options),
            },
        );
        Ok(CreatedContainer {
            id: ContainerId::new(id),
            warnings: Vec::new(),
        })
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        self.record("start_container");
        self.pause().await;
        if self.running(id)? {
            return Err(EngineError::server(304, ""));
        }
        self.set_running(id, true);
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Option<i64>,
    ) -> Result<(), EngineError> {
        self.record("stop_container");
        self.pause().await;
        if !self.running(id)? {
            return Err(EngineError::server(304, ""));
        }
        self.set_running(id, false);
        Ok(())
    }

    async fn restart_container(
        &self,
        id: &ContainerId,
        _timeout: Option<i64>,
    ) -> Result<(), EngineError> {
        self.record("restart_container");
        self.pause().await;
        self.running(id)?;
        self.set_running(id, true);
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), EngineError> {
        self.record("remove_container");
        self.pause().await;
        if self.running(id)? && !force {
            return Err(EngineError::server(
                409,
                "You cannot remove a running container. Stop the container before attempting removal or force remove",
            ));
        }
        self.state.lock().containers.remove(id.as_str());
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<Value, EngineError> {
        self.record("inspect_container");
        self.pause().await;
        let state = self.state.lock();
        let container = state
            .containers
            .get(id.as_str())
            .ok_or_else(|| no_such_container(id))?;
        let ports = container.config["HostConfig"]
            .get("PortBindings")
            .cloned()
            .unwrap_or(Value::Null);
        Ok(json!({
            "Id": container.id,
            "Name": container.name.as_ref().map(|n| format!("/{}", n)),
            "State": {"Running": container.running},
            "Config": container.config,
            "NetworkSettings": {"Ports": ports},
        }))
    }

    async fn commit_container(&self, options: &CommitOptions) -> Result<Value, EngineError> {
        self.record("commit_container");
        self.pause().await;
        let mut state = self.state.lock();
        if !state.containers.contains_key(options.id.as_str()) {
            return Err(no_such_container(&options.id));
        }
        let tag = format!(
            "{}:{}",
            options.repository,
            options.tag.as_deref().unwrap_or("latest")
        );
        Self::add_image(&mut state, tag);
        Ok(json!({"Id": "sha256:committed"}))
    }

    async fn top_processes(&self, id: &ContainerId) -> Result<Value, EngineError> {
        self.record("top_processes");
        self.pause().await;
        self.running(id)?;
        Ok(json!({"Titles": ["PID", "CMD"], "Processes": [["1", "sleep infinity"]]}))
    }

    async fn stats_snapshot(&self, id: &ContainerId) -> Result<Value, EngineError> {
        self.record("stats_snapshot");
        self.pause().await;
        self.running(id)?;
        Ok(json!({"id": id.as_str(), "memory_stats": {"usage": 4096}}))
    }
}

#[async_trait]
impl StreamOps for FakeEngine {
    async fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput, EngineError> {
        self.record("exec");
        self.pause().await;
        if !self.running(id)? {
            return Err(EngineError::server(
                409,
                format!("Container {} is not running", id),
            ));
        }
        Ok(ExecOutput {
            exit_code: Some(0),
            stdout: format!("{}\n", cmd.join(" ")),
            stderr: String::new(),
        })
    }

    fn logs(&self, id: &ContainerId, tail: usize) -> EngineStream<OutputChunk> {
        self.record("logs");
        if self.stall_streams {
            return Box::pin(stream::pending::<Result<OutputChunk, EngineError>>());
        }
        let state = self.state.lock();
        if !state.containers.contains_key(id.as_str()) {
            return Box::pin(stream::iter(vec![Err(no_such_container(id))]));
        }
        let text = state.logs.get(id.as_str()).cloned().unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        let kept = lines[lines.len().saturating_sub(tail)..].join("\n");
        let kept = if kept.is_empty() { kept } else { kept + "\n" };
        Box::pin(stream::iter(chunked(&kept)))
    }

    async fn attach(&self, id: &ContainerId) -> Result<EngineStream<OutputChunk>, EngineError> {
        self.record("attach");
        self.pause().await;
        let state = self.state.lock();
        if !state.containers.contains_key(id.as_str()) {
            return Err(no_such_container(id));
        }
        let text = state.logs.get(id.as_str()).cloned().unwrap_or_default();
        Ok(Box::pin(stream::iter(chunked(&text))))
    }
}
