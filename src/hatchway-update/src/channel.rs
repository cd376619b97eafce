//! Channel resolution: fetching and validating a channel's latest release.

use std::sync::Arc;

use hatchway_store::ObjectStore;
use semver::Version;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::config::BucketLocation;
use crate::error::{UpdateError, UpdateResult};
use crate::version::parse_version;

/// Name of the descriptor object inside each channel directory.
pub const DESCRIPTOR_FILE: &str = "latest.json";

/// The current release of a channel, validated from its `latest.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    /// Artifact identifier (file name under the build prefix)
    pub build: String,
    /// Version text exactly as published
    pub name: String,
    /// Parsed version
    pub version: Version,
    /// Release notes, passed through untouched
    pub notes: Option<Value>,
    /// Publication date, passed through untouched
    pub pub_date: Option<Value>,
}

impl Release {
    /// Validate a channel descriptor body.
    ///
    /// The version is checked before the build so that a descriptor broken
    /// in both places reports the version.
    pub fn from_descriptor(channel: &str, body: &[u8]) -> UpdateResult<Self> {
        let descriptor: Map<String, Value> =
            serde_json::from_slice(body).map_err(|e| UpdateError::MalformedChannel {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let (name, version) = match descriptor.get("version") {
            Some(Value::String(raw)) => match parse_version(raw) {
                Some(version) => (raw.clone(), version),
                None => return Err(malformed_version(channel, raw)),
            },
            Some(Value::Null) | None => return Err(malformed_version(channel, "")),
            Some(other) => return Err(malformed_version(channel, &other.to_string())),
        };

        let build = match descriptor.get("build") {
            Some(Value::String(build)) if !build.is_empty() => build.clone(),
            _ => {
                return Err(UpdateError::MalformedBuild {
                    channel: channel.to_string(),
                });
            }
        };

        Ok(Self {
            build,
            name,
            version,
            notes: passthrough(&descriptor, "notes"),
            pub_date: passthrough(&descriptor, "pub_date"),
        })
    }
}

fn malformed_version(channel: &str, version: &str) -> UpdateError {
    UpdateError::MalformedVersion {
        channel: channel.to_string(),
        version: version.to_string(),
    }
}

fn passthrough(descriptor: &Map<String, Value>, field: &str) -> Option<Value> {
    descriptor.get(field).filter(|v| !v.is_null()).cloned()
}

/// Looks up the current release of a channel in object storage.
///
/// Every call goes to the store; nothing is cached.
#[derive(Debug, Clone)]
pub struct ChannelResolver {
    store: Arc<dyn ObjectStore>,
    location: BucketLocation,
}

impl ChannelResolver {
    /// Create a resolver reading descriptors from `location`.
    pub fn new(store: Arc<dyn ObjectStore>, location: BucketLocation) -> Self {
        Self { store, location }
    }

    /// Get the location descriptors are read from.
    pub fn location(&self) -> &BucketLocation {
        &self.location
    }

    /// Object key of a channel's descriptor.
    pub fn descriptor_key(&self, channel: &str) -> String {
        self.location.joined_key(&[channel, DESCRIPTOR_FILE])
    }

    /// Fetch and validate the latest release of `channel`.
    pub async fn resolve(&self, channel: &str) -> UpdateResult<Release> {
        let bucket = self.location.bucket.as_str();
        let key = self.descriptor_key(channel);
        debug!(channel, bucket, key = %key, "Resolving channel");

        let object = self.store.get_object(bucket, &key).await.map_err(|e| {
            error!(
                channel,
                bucket,
                key = %key,
                status = ?e.status_code(),
                error = %e,
                "Failed to fetch channel descriptor"
            );
            UpdateError::from(e)
        })?;

        Release::from_descriptor(channel, &object.body).inspect_err(|e| {
            error!(
                channel,
                bucket,
                key = %key,
                error = %e,
                "Channel has bad data"
            );
        })
    }
}
