// ABOUTME: HTTP control plane routes under /api/v1/docker.
// ABOUTME: Turns request bodies into raw parameters and failures into status codes.

mod handlers;

use crate::engine::Engine;
use crate::gateway::Gateway;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use handlers::ApiError;

pub const API_PREFIX: &str = "/api/v1/docker";

/// Build the router for `gateway`.
///
/// - `POST /login`
/// - `GET /info`, `GET /disk_util`
/// - `GET /image`, `GET /image/:keyword` (filtered listing)
/// - `POST /image/:action` (search, pull, inspect, remove, tag, push, save, load)
/// - `GET|POST /container` (listing)
/// - `POST /container/:action`
pub fn router<E: Engine>(gateway: Gateway<E>) -> Router {
    let api = Router::new()
        .route("/login", post(handlers::login::<E>))
        .route("/info", get(handlers::info::<E>))
        .route("/disk_util", get(handlers::disk_usage::<E>))
        .route("/image", get(handlers::list_images::<E>))
        .route(
            "/image/:name",
            get(handlers::list_images_matching::<E>).post(handlers::image_action::<E>),
        )
        .route(
            "/container",
            get(handlers::list_containers::<E>).post(handlers::list_containers::<E>),
        )
        .route("/container/:action", post(handlers::container_action::<E>))
        .with_state(gateway);

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
}
