// ABOUTME: Minimal HTTP/1 client for engine endpoints the typed client does not expose cleanly.
// ABOUTME: Used for registry login, disk usage, registry search, and tarball import.

use super::endpoint::Endpoint;
use super::error::EngineError;
use super::traits::EngineStream;
use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::StatusCode;
use hyper::body::Frame;
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::{TcpStream, UnixStream};

/// One-shot request sender. Each call opens a fresh connection.
#[derive(Debug, Clone)]
pub struct RawClient {
    endpoint: Endpoint,
}

type Body = UnsyncBoxBody<Bytes, EngineError>;

/// A request body and its content type.
pub struct RawBody {
    pub content_type: &'static str,
    body: Body,
}

impl RawBody {
    pub fn json(value: &Value) -> Result<Self, EngineError> {
        let bytes = Bytes::from(serde_json::to_vec(value)?);
        Ok(Self {
            content_type: "application/json",
            body: Full::new(bytes).map_err(|never| match never {}).boxed_unsync(),
        })
    }

    /// A tarball sent chunk by chunk as the stream yields it.
    pub fn tar(chunks: EngineStream<Bytes>) -> Self {
        Self {
            content_type: "application/x-tar",
            body: StreamBody::new(chunks.map_ok(Frame::data)).boxed_unsync(),
        }
    }
}

impl RawClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Send a request and decode a JSON reply. Non-2xx replies become
    /// `EngineError::Server` carrying the engine's message.
    pub async fn json(
        &self,
        method: &str,
        path_and_query: &str,
        body: Option<RawBody>,
    ) -> Result<Value, EngineError> {
        let bytes = self.send(method, path_and_query, body).await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request whose reply is a newline-delimited JSON progress
    /// stream. Returns the last object; an object carrying `error` fails.
    pub async fn progress(
        &self,
        method: &str,
        path_and_query: &str,
        body: Option<RawBody>,
    ) -> Result<Value, EngineError> {
        let bytes = self.send(method, path_and_query, body).await?;
        let mut last = Value::Null;
        for line in bytes.split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let value: Value = serde_json::from_slice(line)?;
            if let Some(error) = value.get("error").and_then(Value::as_str) {
                return Err(EngineError::Stream(error.to_string()));
            }
            last = value;
        }
        Ok(last)
    }

    async fn send(
        &self,
        method: &str,
        path_and_query: &str,
        body: Option<RawBody>,
    ) -> Result<Bytes, EngineError> {
        let mut builder = hyper::Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("Host", "localhost");
        let payload = match body {
            Some(body) => {
                builder = builder.header("Content-Type", body.content_type);
                body.body
            }
            None => Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync(),
        };
        let req = builder
            .body(payload)
            .map_err(|e| EngineError::Transport(format!("failed to build request: {}", e)))?;

        let (status, bytes) = match &self.endpoint {
            Endpoint::Unix(path) => {
                let stream = UnixStream::connect(path).await.map_err(|e| {
                    EngineError::Transport(format!("failed to connect to socket: {}", e))
                })?;
                exchange(TokioIo::new(stream), req).await?
            }
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|e| EngineError::Transport(format!("failed to connect: {}", e)))?;
                exchange(TokioIo::new(stream), req).await?
            }
        };

        if status.is_success() {
            Ok(bytes)
        } else {
            Err(EngineError::server(status.as_u16(), error_message(&bytes)))
        }
    }
}

async fn exchange<I>(
    io: I,
    req: hyper::Request<Body>,
) -> Result<(StatusCode, Bytes), EngineError>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| EngineError::Transport(format!("HTTP handshake failed: {}", e)))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::warn!("engine connection error: {}", e);
        }
    });

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| EngineError::Transport(format!("request failed: {}", e)))?;
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| EngineError::Transport(format!("failed to read response: {}", e)))?;
    Ok((status, body.to_bytes()))
}

/// The engine reports errors as `{"message": "..."}`; fall back to raw text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

/// Append `key=value` pairs, percent-encoded, skipping unset values.
pub fn query(path: &str, pairs: &[(&str, Option<&str>)]) -> String {
    let encoded: Vec<String> = pairs
        .iter()
        .filter_map(|(k, v)| v.map(|v| format!("{}={}", k, urlencoding::encode(v))))
        .collect();
    if encoded.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, encoded.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_skips_unset_and_encodes() {
        assert_eq!(
            query(
                "/images/create",
                &[
                    ("fromSrc", Some("-")),
                    ("repo", Some("me/app")),
                    ("tag", None),
                    ("changes", Some("ENV A=1"))
                ]
            ),
            "/images/create?fromSrc=-&repo=me%2Fapp&changes=ENV%20A%3D1"
        );
        assert_eq!(query("/system/df", &[]), "/system/df");
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(br#"{"message":"unauthorized: incorrect username or password"}"#),
            "unauthorized: incorrect username or password"
        );
        assert_eq!(error_message(b"page not found\n"), "page not found");
    }
}
