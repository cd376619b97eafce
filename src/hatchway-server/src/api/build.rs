//! Artifact download endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
};

use crate::error::AppResult;
use crate::state::AppState;

/// Stream a build artifact, mirroring the store's status and headers.
#[tracing::instrument(skip(state))]
pub async fn get_build(
    State(state): State<Arc<AppState>>,
    Path(build_id): Path<String>,
) -> AppResult<Response> {
    Ok(state.artifacts.stream(&build_id).await?)
}
