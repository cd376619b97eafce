//! Store configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which backend to use and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Amazon S3 or an S3-compatible service.
    S3(S3Config),
    /// A local directory laid out as `<root>/<bucket>/<key>`.
    Fs { root: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::S3(S3Config::default())
    }
}

/// S3 connection settings.
///
/// Credentials always come from the default AWS provider chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// Region override. When unset, the AWS environment decides, falling
    /// back to `us-east-1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom endpoint (e.g. `http://localhost:9000` for MinIO).
    /// When set, path-style addressing is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}
