//! Latest build redirect endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use hatchway_update::build_url;

use super::request_host;
use crate::error::AppResult;
use crate::state::AppState;

/// Redirect (301) to whatever build `channel` currently points at.
#[tracing::instrument(skip(state, headers, uri))]
pub async fn get_latest(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    uri: Uri,
) -> AppResult<Response> {
    let release = state.resolver.resolve(&channel).await?;
    let host = request_host(&headers, &uri, &state.config);
    let location = build_url(state.config.scheme, &host, &release.build);

    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response())
}
