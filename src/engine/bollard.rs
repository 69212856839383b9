// ABOUTME: Bollard-based engine implementation.
// ABOUTME: Talks to Docker or Podman through the Docker-compatible API.

use super::endpoint::Endpoint;
use super::error::{ClientSnafu, ConnectError, EngineError, PingSnafu};
use super::raw::{RawBody, RawClient, query};
use super::traits::{
    ContainerOps, CreatedContainer, EngineStream, ExecOutput, ImageOps, ImportRequest,
    OutputChunk, OutputStream, RegistryAuth, StreamOps, SystemOps,
};
use super::wire;
use crate::params::{CommitOptions, ContainerCreateOptions};
use crate::types::{ContainerId, ExecId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::exec::{StartExecOptions, StartExecResults};
use bollard::models::ContainerCreateBody;
use bollard::query_parameters::{
    AttachContainerOptionsBuilder, CommitContainerOptionsBuilder, CreateContainerOptions,
    CreateImageOptions, InspectContainerOptions, ListContainersOptions, ListImagesOptions,
    LogsOptions, PushImageOptionsBuilder, RemoveContainerOptions, RemoveImageOptions,
    RestartContainerOptionsBuilder, StatsOptionsBuilder, StopContainerOptions,
    TagImageOptionsBuilder,
};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::{Value, json};
use snafu::ResultExt;
use std::time::Duration;

fn to_value<T: Serialize>(value: T) -> Result<Value, EngineError> {
    Ok(serde_json::to_value(value)?)
}

fn credentials(auth: Option<&RegistryAuth>) -> Option<bollard::auth::DockerCredentials> {
    auth.map(|a| bollard::auth::DockerCredentials {
        username: Some(a.username.clone()),
        password: Some(a.password.clone()),
        serveraddress: a.server.clone(),
        ..Default::default()
    })
}

fn output_chunk(output: LogOutput) -> OutputChunk {
    match output {
        LogOutput::StdErr { message } => OutputChunk::stderr(String::from_utf8_lossy(&message)),
        LogOutput::StdOut { message }
        | LogOutput::StdIn { message }
        | LogOutput::Console { message } => OutputChunk::stdout(String::from_utf8_lossy(&message)),
    }
}

/// Engine backed by a bollard client plus a raw HTTP client for the few
/// endpoints used without typed wrappers.
pub struct BollardEngine {
    client: Docker,
    raw: RawClient,
    endpoint: Endpoint,
}

impl BollardEngine {
    /// Build the client for `endpoint`. No request is sent.
    pub fn new(endpoint: Endpoint, client_timeout: Duration) -> Result<Self, ConnectError> {
        let label = endpoint.to_string();
        let timeout = client_timeout.as_secs().max(1);
        let client = match &endpoint {
            Endpoint::Unix(path) => Docker::connect_with_unix(
                &path.to_string_lossy(),
                timeout,
                bollard::API_DEFAULT_VERSION,
            ),
            Endpoint::Tcp { host, port } => Docker::connect_with_http(
                &format!("http://{}:{}", host, port),
                timeout,
                bollard::API_DEFAULT_VERSION,
            ),
        }
        .context(ClientSnafu { endpoint: label })?;

        Ok(Self {
            client,
            raw: RawClient::new(endpoint.clone()),
            endpoint,
        })
    }

    /// Build the client and confirm the engine answers.
    pub async fn connect(endpoint: Endpoint, client_timeout: Duration) -> Result<Self, ConnectError> {
        let engine = Self::new(endpoint, client_timeout)?;
        engine.ping().await.context(PingSnafu {
            endpoint: engine.endpoint.to_string(),
        })?;
        tracing::info!(endpoint = %engine.endpoint, "connected to container engine");
        Ok(engine)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn exec_exit_code(&self, exec_id: &ExecId) -> Result<Option<i64>, EngineError> {
        let details = self.client.inspect_exec(exec_id.as_str()).await?;
        Ok(details.exit_code)
    }
}

#[async_trait]
impl SystemOps for BollardEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.client.ping().await?;
        Ok(())
    }

    async fn info(&self) -> Result<Value, EngineError> {
        to_value(self.client.info().await?)
    }

    async fn disk_usage(&self) -> Result<Value, EngineError> {
        self.raw.json("GET", "/system/df", None).await
    }

    async fn login(&self, auth: &RegistryAuth) -> Result<Value, EngineError> {
        let mut body = json!({
            "username": auth.username,
            "password": auth.password,
        });
        if let Some(server) = &auth.server {
            body["serveraddress"] = json!(server);
        }
        let reply = self
            .raw
            .json("POST", "/auth", Some(RawBody::json(&body)?))
            .await?;
        // Drop the identity token; it is a credential.
        Ok(json!({ "Status": reply.get("Status").cloned().unwrap_or(Value::Null) }))
    }
}

#[async_trait]
impl ImageOps for BollardEngine {
    async fn list_images(&self) -> Result<Vec<Value>, EngineError> {
        let opts = ListImagesOptions {
            all: false,
            ..Default::default()
        };
        self.client
            .list_images(Some(opts))
            .await?
            .into_iter()
            .map(to_value)
            .collect()
    }

    async fn search_images(&self, term: &str) -> Result<Vec<Value>, EngineError> {
        let reply = self
            .raw
            .json("GET", &query("/images/search", &[("term", Some(term))]), None)
            .await?;
        match reply {
            Value::Array(items) => Ok(items),
            other => Err(EngineError::Decode(format!(
                "expected a list of search results, got {}",
                other
            ))),
        }
    }

    fn pull_image(
        &self,
        image: &ImageRef,
        tag: &str,
        auth: Option<&RegistryAuth>,
    ) -> EngineStream<Value> {
        let opts = CreateImageOptions {
            from_image: Some(image.to_string()),
            tag: Some(tag.to_string()),
            ..Default::default()
        };
        let stream = self
            .client
            .create_image(Some(opts), None, credentials(auth))
            .map(|item| item.map_err(EngineError::from).and_then(to_value));
        Box::pin(stream)
    }

    async fn inspect_image(&self, image: &ImageRef) -> Result<Value, EngineError> {
        to_value(self.client.inspect_image(image.as_str()).await?)
    }

    async fn remove_image(&self, image: &ImageRef, force: bool) -> Result<Value, EngineError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };
        to_value(
            self.client
                .remove_image(image.as_str(), Some(opts), None)
                .await?,
        )
    }

    async fn tag_image(
        &self,
        image: &ImageRef,
        repository: &str,
        tag: Option<&str>,
    ) -> Result<(), EngineError> {
        let mut builder = TagImageOptionsBuilder::default().repo(repository);
        if let Some(tag) = tag {
            builder = builder.tag(tag);
        }
        self.client
            .tag_image(image.as_str(), Some(builder.build()))
            .await?;
        Ok(())
    }

    fn push_image(
        &self,
        repository: &str,
        tag: Option<&str>,
        auth: Option<&RegistryAuth>,
    ) -> EngineStream<Value> {
        let mut builder = PushImageOptionsBuilder::default();
        if let Some(tag) = tag {
            builder = builder.tag(tag);
        }
        let stream = self
            .client
            .push_image(repository, Some(builder.build()), credentials(auth))
            .map(|item| item.map_err(EngineError::from).and_then(to_value));
        Box::pin(stream)
    }

    fn export_image(&self, image: &ImageRef) -> EngineStream<Bytes> {
        Box::pin(
            self.client
                .export_image(image.as_str())
                .map_err(EngineError::from),
        )
    }

    async fn import_image(&self, request: ImportRequest) -> Result<Value, EngineError> {
        let path = query(
            "/images/create",
            &[
                ("fromSrc", Some("-")),
                ("repo", Some(request.repository.as_str())),
                ("tag", request.tag.as_deref()),
                ("changes", request.changes.as_deref()),
            ],
        );
        self.raw
            .progress("POST", &path, Some(RawBody::tar(request.archive)))
            .await
    }
}

#[async_trait]
impl ContainerOps for BollardEngine {
    async fn list_containers(&self, all: bool) -> Result<Vec<Value>, EngineError> {
        let opts = ListContainersOptions {
            all,
            ..Default::default()
        };
        self.client
            .list_containers(Some(opts))
            .await?
            .into_iter()
            .map(to_value)
            .collect()
    }

    async fn create_container(
        &self,
        options: &ContainerCreateOptions,
    ) -> Result<CreatedContainer, EngineError> {
        let body: ContainerCreateBody =
            serde_json::from_value(wire::container_create_body(options))?;
        let opts = CreateContainerOptions {
            name: options.name.clone(),
            ..Default::default()
        };
        let response = self.client.create_container(Some(opts), body).await?;
        Ok(CreatedContainer {
            id: ContainerId::new(response.id),
            warnings: response.warnings,
        })
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        self.client
            .start_container(
                id.as_str(),
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await?;
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Option<i64>,
    ) -> Result<(), EngineError> {
        let opts = StopContainerOptions {
            t: timeout.map(grace_seconds).transpose()?,
            signal: None,
        };
        self.client.stop_container(id.as_str(), Some(opts)).await?;
        Ok(())
    }

    async fn restart_container(
        &self,
        id: &ContainerId,
        timeout: Option<i64>,
    ) -> Result<(), EngineError> {
        let mut builder = RestartContainerOptionsBuilder::default();
        if let Some(t) = timeout {
            builder = builder.t(grace_seconds(t)?);
        }
        self.client
            .restart_container(id.as_str(), Some(builder.build()))
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), EngineError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.client
            .remove_container(id.as_str(), Some(opts))
            .await?;
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<Value, EngineError> {
        to_value(
            self.client
                .inspect_container(id.as_str(), None::<InspectContainerOptions>)
                .await?,
        )
    }

    async fn commit_container(&self, options: &CommitOptions) -> Result<Value, EngineError> {
        let mut builder = CommitContainerOptionsBuilder::default()
            .container(options.id.as_str())
            .repo(&options.repository);
        if let Some(tag) = &options.tag {
            builder = builder.tag(tag);
        }
        if let Some(message) = &options.message {
            builder = builder.comment(message);
        }
        if let Some(author) = &options.author {
            builder = builder.author(author);
        }
        if let Some(changes) = &options.changes {
            builder = builder.changes(changes);
        }
        let config: bollard::models::ContainerConfig = match &options.conf {
            Some(conf) => serde_json::from_value(Value::Object(conf.clone()))?,
            None => Default::default(),
        };
        to_value(self.client.commit_container(builder.build(), config).await?)
    }

    async fn top_processes(&self, id: &ContainerId) -> Result<Value, EngineError> {
        to_value(
            self.client
                .top_processes(
                    id.as_str(),
                    None::<bollard::query_parameters::TopOptions>,
                )
                .await?,
        )
    }

    async fn stats_snapshot(&self, id: &ContainerId) -> Result<Value, EngineError> {
        let opts = StatsOptionsBuilder::default()
            .stream(false)
            .one_shot(true)
            .build();
        let mut stream = Box::pin(self.client.stats(id.as_str(), Some(opts)));
        match stream.next().await {
            Some(stats) => to_value(stats?),
            None => Err(EngineError::Decode("engine returned no stats".to_string())),
        }
    }
}

#[async_trait]
impl StreamOps for BollardEngine {
    async fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput, EngineError> {
        let config = bollard::models::ExecConfig {
            cmd: Some(cmd.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };
        let exec_id = ExecId::new(self.client.create_exec(id.as_str(), config).await?.id);
        tracing::debug!(container = %id, exec = %exec_id, "exec created");

        let opts = StartExecOptions {
            detach: false,
            ..Default::default()
        };
        let mut stdout = String::new();
        let mut stderr = String::new();
        if let StartExecResults::Attached { mut output, .. } =
            self.client.start_exec(exec_id.as_str(), Some(opts)).await?
        {
            while let Some(item) = output.next().await {
                let chunk = output_chunk(item?);
                match chunk.stream {
                    OutputStream::Stdout => stdout.push_str(&chunk.content),
                    OutputStream::Stderr => stderr.push_str(&chunk.content),
                }
            }
        }

        Ok(ExecOutput {
            exit_code: self.exec_exit_code(&exec_id).await?,
            stdout,
            stderr,
        })
    }

    fn logs(&self, id: &ContainerId, tail: usize) -> EngineStream<OutputChunk> {
        let opts = LogsOptions {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            tail: tail.to_string(),
            ..Default::default()
        };
        Box::pin(
            self.client
                .logs(id.as_str(), Some(opts))
                .map(|item| item.map(output_chunk).map_err(EngineError::from)),
        )
    }

    async fn attach(&self, id: &ContainerId) -> Result<EngineStream<OutputChunk>, EngineError> {
        let opts = AttachContainerOptionsBuilder::default()
            .stdout(true)
            .stderr(true)
            .logs(true)
            .stream(false)
            .build();
        let attached = self
            .client
            .attach_container(id.as_str(), Some(opts))
            .await?;
        Ok(Box::pin(
            attached
                .output
                .map(|item| item.map(output_chunk).map_err(EngineError::from)),
        ))
    }
}

fn grace_seconds(timeout: i64) -> Result<i32, EngineError> {
    i32::try_from(timeout)
        .map_err(|_| EngineError::Decode(format!("stop timeout {} is out of range", timeout)))
}
