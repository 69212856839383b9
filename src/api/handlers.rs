// ABOUTME: Axum handlers forwarding requests to the gateway.
// ABOUTME: Body fields win over query fields; failures render as {kind, message}.

use crate::engine::Engine;
use crate::gateway::{Gateway, Operation};
use crate::outcome::{Failure, FailureKind, LifecycleResult};
use crate::params::RawParameters;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::HashMap;

type Fields = Query<HashMap<String, String>>;

/// A failure on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub Failure);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind {
            FailureKind::InvalidParameters => StatusCode::BAD_REQUEST,
            FailureKind::NotFound => StatusCode::NOT_FOUND,
            FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            FailureKind::EngineRejected | FailureKind::IoError | FailureKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<Failure> for ApiError {
    fn from(failure: Failure) -> Self {
        ApiError(failure)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0)).into_response()
    }
}

fn reply(result: LifecycleResult<Value>) -> Response {
    match result {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(failure) => ApiError(failure).into_response(),
    }
}

/// JSON body fields, then query fields that the body did not set.
fn raw_parameters(query: HashMap<String, String>, body: &[u8]) -> LifecycleResult<RawParameters> {
    let mut raw = if body.iter().all(u8::is_ascii_whitespace) {
        RawParameters::new()
    } else {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            Failure::new(
                FailureKind::InvalidParameters,
                format!("request body is not valid JSON: {}", e),
            )
        })?;
        RawParameters::from_json(value)?
    };
    raw.merge_strings(query);
    Ok(raw)
}

async fn run<E: Engine>(
    gateway: &Gateway<E>,
    op: Operation,
    query: HashMap<String, String>,
    body: &[u8],
) -> Response {
    match raw_parameters(query, body) {
        Ok(raw) => reply(gateway.dispatch(op, &raw).await),
        Err(failure) => ApiError(failure).into_response(),
    }
}

fn unknown_action(scope: &str, action: &str) -> Response {
    ApiError(Failure::new(
        FailureKind::NotFound,
        format!("unknown {} action: {}", scope, action),
    ))
    .into_response()
}

pub async fn login<E: Engine>(
    State(gateway): State<Gateway<E>>,
    Query(query): Fields,
    body: Bytes,
) -> Response {
    run(&gateway, Operation::Login, query, &body).await
}

pub async fn info<E: Engine>(State(gateway): State<Gateway<E>>) -> Response {
    reply(gateway.info().await)
}

pub async fn disk_usage<E: Engine>(State(gateway): State<Gateway<E>>) -> Response {
    reply(gateway.disk_usage().await)
}

pub async fn list_images<E: Engine>(State(gateway): State<Gateway<E>>) -> Response {
    reply(gateway.list_images().await.map(Value::from))
}

pub async fn list_images_matching<E: Engine>(
    State(gateway): State<Gateway<E>>,
    Path(keyword): Path<String>,
) -> Response {
    reply(gateway.list_images_matching(&keyword).await.map(Value::from))
}

pub async fn image_action<E: Engine>(
    State(gateway): State<Gateway<E>>,
    Path(action): Path<String>,
    Query(query): Fields,
    body: Bytes,
) -> Response {
    match Operation::from_route("image", &action) {
        Some(op) => run(&gateway, op, query, &body).await,
        None => unknown_action("image", &action),
    }
}

pub async fn list_containers<E: Engine>(
    State(gateway): State<Gateway<E>>,
    Query(query): Fields,
    body: Bytes,
) -> Response {
    run(&gateway, Operation::ContainerList, query, &body).await
}

pub async fn container_action<E: Engine>(
    State(gateway): State<Gateway<E>>,
    Path(action): Path<String>,
    Query(query): Fields,
    body: Bytes,
) -> Response {
    match Operation::from_route("container", &action) {
        Some(op) => run(&gateway, op, query, &body).await,
        None => unknown_action("container", &action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_failure_kinds() {
        let cases = [
            (FailureKind::InvalidParameters, 400),
            (FailureKind::NotFound, 404),
            (FailureKind::EngineRejected, 500),
            (FailureKind::IoError, 500),
            (FailureKind::Internal, 500),
            (FailureKind::Timeout, 504),
        ];
        for (kind, status) in cases {
            assert_eq!(ApiError(Failure::new(kind, "x")).status().as_u16(), status);
        }
    }

    #[test]
    fn body_fields_win_over_query_fields() {
        let query = HashMap::from([
            ("image_name".to_string(), "from-query".to_string()),
            ("image_tag".to_string(), "1.0".to_string()),
        ]);
        let raw = raw_parameters(query, br#"{"image_name": "from-body"}"#).unwrap();
        assert_eq!(raw.get("image_name"), Some(&Value::from("from-body")));
        assert_eq!(raw.get("image_tag"), Some(&Value::from("1.0")));
    }

    #[test]
    fn empty_body_is_no_parameters() {
        assert!(raw_parameters(HashMap::new(), b"  ").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_invalid_parameters() {
        let failure = raw_parameters(HashMap::new(), b"{not json").unwrap_err();
        assert_eq!(failure.kind, FailureKind::InvalidParameters);
        let failure = raw_parameters(HashMap::new(), b"[1, 2]").unwrap_err();
        assert_eq!(failure.kind, FailureKind::InvalidParameters);
    }
}
