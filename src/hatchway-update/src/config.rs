//! Update configuration types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::{join_key, prefixed_key};

/// Scheme advertised in build URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP (default)
    #[default]
    Http,
    /// HTTPS, for deployments behind a TLS-terminating proxy
    Https,
}

impl Scheme {
    /// Get the scheme as it appears in a URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported scheme.
#[derive(Debug, Clone, Error)]
#[error("bad scheme {0:?}, expected \"http\" or \"https\"")]
pub struct ParseSchemeError(pub String);

impl FromStr for Scheme {
    type Err = ParseSchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(ParseSchemeError(other.to_string())),
        }
    }
}

/// Where a family of objects lives: a bucket and a key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketLocation {
    /// Bucket name
    pub bucket: String,
    /// Key prefix, empty for the bucket root
    #[serde(default)]
    pub prefix: String,
}

impl BucketLocation {
    /// Create a location.
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Key for a name placed directly after the prefix.
    pub fn key(&self, name: &str) -> String {
        prefixed_key(&self.prefix, name)
    }

    /// Key for path segments joined under the prefix.
    pub fn joined_key(&self, segments: &[&str]) -> String {
        join_key(std::iter::once(self.prefix.as_str()).chain(segments.iter().copied()))
    }
}
