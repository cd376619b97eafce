//! Hatchway Store - object storage access for the update server.
//!
//! The server only talks to storage through the [`ObjectStore`] trait:
//! - `get_object` fetches a whole (small) object such as a channel descriptor
//! - `stream_object` yields status and headers first, then the body as a stream
//!
//! Backends:
//! - [`S3Store`] for Amazon S3 and S3-compatible services, via the AWS SDK
//! - [`FsStore`] for a local directory tree laid out as `<root>/<bucket>/<key>`
//! - [`MemoryStore`] for tests and demos

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod config;
mod error;
mod fs;
mod memory;
mod object;
mod s3;

use std::sync::Arc;

pub use config::{S3Config, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use fs::FsStore;
pub use memory::{MemoryFailure, MemoryStore};
pub use object::{ByteStream, ObjectStore, ObjectStream, StoredObject};
pub use s3::S3Store;

/// Build the store described by `config`.
///
/// For S3 this loads credentials and region from the AWS environment.
pub async fn build_store(config: &StoreConfig) -> StoreResult<Arc<dyn ObjectStore>> {
    match config {
        StoreConfig::S3(s3) => Ok(Arc::new(S3Store::connect(s3).await?)),
        StoreConfig::Fs { root } => Ok(Arc::new(FsStore::new(root.clone()))),
    }
}
