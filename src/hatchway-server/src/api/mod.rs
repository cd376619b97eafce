//! HTTP routes and handlers.
//!
//! - `GET /build/{build_id}` streams an artifact from the build bucket
//! - `GET /status/{channel}/{version}` answers an update check
//! - `GET /latest/{channel}` redirects to the channel's current build
//! - `GET /health` reports liveness

mod build;
mod health;
mod latest;
mod status;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderMap, Uri, header},
    routing::get,
};

use crate::config::ServerConfig;
use crate::state::AppState;

pub use health::HealthResponse;

/// Create the API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/build/{build_id}", get(build::get_build))
        .route("/status/{channel}/{version}", get(status::get_status))
        .route("/latest/{channel}", get(latest::get_latest))
}

/// Host the client used to reach us, for building absolute URLs.
///
/// Falls back to the URI authority (HTTP/2) and then to
/// `localhost:<port>`.
fn request_host(headers: &HeaderMap, uri: &Uri, config: &ServerConfig) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| config.fallback_host())
}
