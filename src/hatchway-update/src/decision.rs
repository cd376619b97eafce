//! The update decision.

use semver::Version;
use serde::Serialize;
use serde_json::Value;

use crate::BUILD_SEGMENT;
use crate::channel::Release;
use crate::config::Scheme;
use crate::key::join_key;
use crate::version::{VersionComparison, compare_parsed};

/// What a client receives when an update is available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatePayload {
    /// Version of the new release
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<Value>,
    /// Where to download the build
    pub url: String,
}

/// Outcome of comparing a client's version with a channel's release.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDecision {
    /// The client is up to date (or ahead).
    NoUpdate,
    /// A newer release exists.
    Available(UpdatePayload),
}

impl UpdateDecision {
    /// Check if an update is available.
    pub fn has_update(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Get the payload, if an update is available.
    pub fn payload(&self) -> Option<&UpdatePayload> {
        match self {
            Self::Available(payload) => Some(payload),
            Self::NoUpdate => None,
        }
    }
}

/// URL at which `build` is served through this server.
pub fn build_url(scheme: Scheme, host: &str, build: &str) -> String {
    format!("{}://{}", scheme, join_key([host, BUILD_SEGMENT, build]))
}

/// Decide whether a client on `requested` should move to `release`.
pub fn decide(requested: &Version, release: &Release, scheme: Scheme, host: &str) -> UpdateDecision {
    if compare_parsed(requested, &release.version) != VersionComparison::Older {
        return UpdateDecision::NoUpdate;
    }

    UpdateDecision::Available(UpdatePayload {
        name: release.name.clone(),
        notes: release.notes.clone(),
        pub_date: release.pub_date.clone(),
        url: build_url(scheme, host, &release.build),
    })
}
