//! Update check endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use hatchway_update::{UpdateDecision, UpdateError, decide, parse_version};
use tracing::{debug, info, warn};

use super::request_host;
use crate::error::AppResult;
use crate::state::AppState;

/// Tell a client on `version` whether `channel` has something newer.
///
/// - 200 with the update payload when an update exists
/// - 204 with no body when the client is current
/// - 400 `invalid version` before touching the store when `version` is not
///   semver
#[tracing::instrument(skip(state, headers, uri))]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path((channel, version)): Path<(String, String)>,
    headers: HeaderMap,
    uri: Uri,
) -> AppResult<Response> {
    let Some(requested) = parse_version(&version) else {
        warn!("Bad version on channel");
        return Err(UpdateError::InvalidVersion { version }.into());
    };

    let release = state.resolver.resolve(&channel).await?;
    let host = request_host(&headers, &uri, &state.config);

    match decide(&requested, &release, state.config.scheme, &host) {
        UpdateDecision::NoUpdate => {
            debug!(latest = %release.name, "Client is up to date");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        UpdateDecision::Available(payload) => {
            info!(latest = %payload.name, "Update available");
            Ok(Json(payload).into_response())
        }
    }
}
