//! Application state management.

use std::sync::Arc;

use hatchway_store::ObjectStore;
use hatchway_update::ChannelResolver;

use crate::artifact::ArtifactProxy;
use crate::config::ServerConfig;

/// Application state shared across request handlers.
///
/// Everything in here is immutable after startup.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Channel descriptor lookups.
    pub resolver: ChannelResolver,
    /// Artifact streaming.
    pub artifacts: ArtifactProxy,
}

impl AppState {
    /// Wire the resolver and proxy to `store` using the locations in `config`.
    pub fn new(config: ServerConfig, store: Arc<dyn ObjectStore>) -> Self {
        let resolver = ChannelResolver::new(Arc::clone(&store), config.channels.clone());
        let artifacts = ArtifactProxy::new(store, config.builds.clone());

        Self {
            config,
            resolver,
            artifacts,
        }
    }
}
