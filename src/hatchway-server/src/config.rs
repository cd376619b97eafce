//! Server configuration.

use std::path::{Path, PathBuf};

use hatchway_store::{S3Config, StoreConfig};
use hatchway_update::{BucketLocation, Scheme};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable names.
pub mod env {
    pub const BUILD_BUCKET: &str = "HATCHWAY_BUILD_BUCKET";
    pub const BUILD_PREFIX: &str = "HATCHWAY_BUILD_PREFIX";
    pub const CHANNEL_BUCKET: &str = "HATCHWAY_CHANNEL_BUCKET";
    pub const CHANNEL_PREFIX: &str = "HATCHWAY_CHANNEL_PREFIX";
    pub const SCHEME: &str = "HATCHWAY_SCHEME";
    pub const HOST: &str = "HATCHWAY_HOST";
    pub const PORT: &str = "HATCHWAY_PORT";
    pub const STORE: &str = "HATCHWAY_STORE";
    pub const STORE_ROOT: &str = "HATCHWAY_STORE_ROOT";
    pub const S3_ENDPOINT: &str = "HATCHWAY_S3_ENDPOINT";
    pub const S3_REGION: &str = "HATCHWAY_S3_REGION";
    pub const SHUTDOWN_TIMEOUT: &str = "HATCHWAY_SHUTDOWN_TIMEOUT";
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Must set {setting}")]
    Missing { setting: &'static str },

    #[error("If set, {setting} must not start with \"/\"")]
    AbsolutePrefix { setting: &'static str },

    #[error("Bad value for {setting}: {value}")]
    Invalid {
        setting: &'static str,
        value: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Scheme advertised in build URLs.
    #[serde(default)]
    pub scheme: Scheme,

    /// Where build artifacts live.
    pub builds: BucketLocation,

    /// Where channel descriptors live.
    pub channels: BucketLocation,

    /// Object store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Seconds open connections get to finish after a shutdown signal.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheme: Scheme::default(),
            builds: BucketLocation::new("", ""),
            channels: BucketLocation::new("", ""),
            store: StoreConfig::default(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load from any variable source. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.builds = BucketLocation::new(
            var(env::BUILD_BUCKET).unwrap_or_default(),
            var(env::BUILD_PREFIX).unwrap_or_default(),
        );
        config.channels = BucketLocation::new(
            var(env::CHANNEL_BUCKET).unwrap_or_default(),
            var(env::CHANNEL_PREFIX).unwrap_or_default(),
        );

        if let Some(scheme) = var(env::SCHEME) {
            config.scheme = scheme.parse().map_err(|_| ConfigError::Invalid {
                setting: env::SCHEME,
                value: scheme,
            })?;
        }

        if let Some(host) = var(env::HOST) {
            config.host = host;
        }

        if let Some(port) = var(env::PORT) {
            config.port = port.parse().map_err(|_| ConfigError::Invalid {
                setting: env::PORT,
                value: port,
            })?;
        }

        if let Some(timeout) = var(env::SHUTDOWN_TIMEOUT) {
            config.shutdown_timeout = timeout.parse().map_err(|_| ConfigError::Invalid {
                setting: env::SHUTDOWN_TIMEOUT,
                value: timeout,
            })?;
        }

        config.store = match var(env::STORE).as_deref() {
            None | Some("s3") => StoreConfig::S3(S3Config {
                region: var(env::S3_REGION),
                endpoint: var(env::S3_ENDPOINT),
            }),
            Some("fs") => StoreConfig::Fs {
                root: var(env::STORE_ROOT)
                    .map(PathBuf::from)
                    .ok_or(ConfigError::Missing {
                        setting: env::STORE_ROOT,
                    })?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    setting: env::STORE,
                    value: other.to_string(),
                });
            }
        };

        Ok(config)
    }

    /// Check the settings that have no usable default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.builds.bucket.is_empty() {
            return Err(ConfigError::Missing {
                setting: env::BUILD_BUCKET,
            });
        }
        if self.builds.prefix.starts_with('/') {
            return Err(ConfigError::AbsolutePrefix {
                setting: env::BUILD_PREFIX,
            });
        }
        if self.channels.bucket.is_empty() {
            return Err(ConfigError::Missing {
                setting: env::CHANNEL_BUCKET,
            });
        }
        if self.channels.prefix.starts_with('/') {
            return Err(ConfigError::AbsolutePrefix {
                setting: env::CHANNEL_PREFIX,
            });
        }
        if let StoreConfig::Fs { root } = &self.store {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::Missing {
                    setting: env::STORE_ROOT,
                });
            }
        }
        Ok(())
    }

    /// Address to bind (e.g., "0.0.0.0:3000").
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Host used in build URLs when a request carries no `Host` header.
    pub fn fallback_host(&self) -> String {
        format!("localhost:{}", self.port)
    }
}
