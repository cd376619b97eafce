//! Error types for the update server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hatchway_store::StoreError;
use hatchway_update::UpdateError;
use thiserror::Error;

/// Application error type.
///
/// Every error is answered with its carried status code (500 when it has
/// none) and its message as a plain-text body.
#[derive(Debug, Error)]
pub enum AppError {
    /// Update resolution error (bad input, bad channel data, storage).
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Storage error outside of channel resolution.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        let carried = match self {
            Self::Update(e) => e.status_code(),
            Self::Store(e) => e.status_code(),
        };

        carried
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Result type for the update server.
pub type AppResult<T> = Result<T, AppError>;
