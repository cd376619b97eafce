//! Error types for hatchway-update.

use hatchway_store::StoreError;
use thiserror::Error;

/// Result type for update operations.
pub type UpdateResult<T> = std::result::Result<T, UpdateError>;

/// Errors that can occur while deciding on an update.
///
/// The `Display` text of each variant is what clients receive as the
/// response body.
#[derive(Debug, Error)]
pub enum UpdateError {
    // Request errors
    #[error("invalid version")]
    InvalidVersion { version: String },

    // Channel data errors
    #[error("bad data in channel {channel}: {reason}")]
    MalformedChannel { channel: String, reason: String },

    #[error("bad version data in channel {channel}: {version}")]
    MalformedVersion { channel: String, version: String },

    #[error("bad build data for {channel}")]
    MalformedBuild { channel: String },

    // Storage errors
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl UpdateError {
    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::InvalidVersion { .. } => Some(400),
            Self::Store(e) => e.status_code(),
            Self::MalformedChannel { .. }
            | Self::MalformedVersion { .. }
            | Self::MalformedBuild { .. } => None,
        }
    }

    /// Check if this error comes from bad channel data.
    pub fn is_malformed_channel(&self) -> bool {
        matches!(
            self,
            Self::MalformedChannel { .. }
                | Self::MalformedVersion { .. }
                | Self::MalformedBuild { .. }
        )
    }
}
