//! Error types for hatchway-store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while talking to an object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a failure status (e.g. 404 NoSuchKey).
    ///
    /// Displays as the bare store message so it can be relayed to clients.
    #[error("{message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The store could not be reached or gave no usable answer.
    #[error("{message}")]
    Network { message: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid object key: {key}")]
    InvalidKey { key: String },

    #[error("Invalid store configuration: {message}")]
    Config { message: String },
}

impl StoreError {
    /// Shorthand for the error a store reports for a missing key.
    pub fn no_such_key() -> Self {
        Self::Status {
            status: 404,
            code: Some("NoSuchKey".to_string()),
            message: "The specified key does not exist.".to_string(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::InvalidKey { .. } => Some(400),
            Self::Network { .. } | Self::Io(_) | Self::Config { .. } => None,
        }
    }

    /// Check if the store reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}
