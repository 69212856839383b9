// ABOUTME: Integration tests for the HTTP routes.
// ABOUTME: Drives the axum router in-process against the scripted engine.

mod support;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use berth::api::{API_PREFIX, router};
use berth::gateway::{Gateway, GatewaySettings};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use support::fake_engine::FakeEngine;
use tower::ServiceExt;

fn app(engine: FakeEngine) -> Router {
    support::init_tracing();
    router(Gateway::new(engine, GatewaySettings::default()))
}

async fn send(app: Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let uri = format!("{}{}", API_PREFIX, path);
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn info_returns_engine_information() {
    let (status, body) = send(app(FakeEngine::new()), Method::GET, "/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ServerVersion"], "fake-1.0");
}

#[tokio::test]
async fn disk_util_route_reports_usage() {
    let (status, body) = send(app(FakeEngine::new()), Method::GET, "/disk_util", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("LayersSize").is_some());
}

#[tokio::test]
async fn image_listing_and_keyword_filter() {
    let engine = || {
        FakeEngine::new()
            .with_image("a/b:latest", "sha1")
            .with_image("c/d:latest", "sha2")
    };
    let (status, body) = send(app(engine()), Method::GET, "/image", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(app(engine()), Method::GET, "/image/sha2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"Id": "sha2", "RepoTags": ["c/d:latest"], "Size": 1024}]));
}

#[tokio::test]
async fn missing_parameters_are_bad_requests() {
    let (status, body) = send(
        app(FakeEngine::new()),
        Method::POST,
        "/image/pull",
        Some(json!({"image_tag": "1.0"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidParameters");
    assert!(body["message"].as_str().unwrap().contains("image_name"));
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let (status, body) = send(
        app(FakeEngine::new()),
        Method::POST,
        "/image/inspect",
        Some(json!({"image_id": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[tokio::test]
async fn unknown_actions_are_not_found() {
    let (status, body) = send(
        app(FakeEngine::new()),
        Method::POST,
        "/container/build",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[tokio::test]
async fn query_string_supplies_parameters() {
    let (status, body) = send(
        app(FakeEngine::new()),
        Method::POST,
        "/image/pull?image_name=nginx&image_tag=1.27",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tag"], "1.27");
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("{}/login", API_PREFIX))
        .body(Body::from("{oops"))
        .unwrap();
    let response = app(FakeEngine::new()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn conflicts_map_to_server_error() {
    let router = app(FakeEngine::new().with_image("nginx:latest", "sha256:1"));
    let create = json!({"image_name": "nginx", "name": "web"});

    let (status, _) = send(router.clone(), Method::POST, "/container/create", Some(create.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(router, Method::POST, "/container/create", Some(create)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "EngineRejected");
}

#[tokio::test]
async fn container_listing_accepts_get_and_post() {
    let router = app(FakeEngine::new());
    let (status, body) = send(router.clone(), Method::GET, "/container", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(router, Method::POST, "/container", Some(json!({"all": true}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_route_hides_password() {
    let (status, body) = send(
        app(FakeEngine::new()),
        Method::POST,
        "/login",
        Some(json!({"login_user": "alice", "login_pass": "s3cret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Status"], "Login Succeeded");
    assert!(!body.to_string().contains("s3cret"));
}

#[tokio::test]
async fn slow_engine_maps_to_gateway_timeout() {
    support::init_tracing();
    let settings = GatewaySettings {
        timeout: std::time::Duration::from_millis(20),
        ..GatewaySettings::default()
    };
    let engine = FakeEngine::new().with_delay(std::time::Duration::from_millis(300));
    let router = router(Gateway::new(engine, settings));
    let (status, body) = send(router, Method::GET, "/info", None).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["kind"], "Timeout");
}
