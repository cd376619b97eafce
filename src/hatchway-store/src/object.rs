//! Object store interface.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use http::{HeaderMap, StatusCode};

use crate::error::{StoreError, StoreResult};

/// Body of a streamed object.
pub type ByteStream = BoxStream<'static, StoreResult<Bytes>>;

/// A fully buffered object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Status reported by the store (always a success status).
    pub status: StatusCode,
    /// Response headers reported by the store.
    pub headers: HeaderMap,
    /// Object contents.
    pub body: Bytes,
}

/// An object whose status and headers are known but whose body has not been
/// read yet.
pub struct ObjectStream {
    /// Status reported by the store, success or not.
    pub status: StatusCode,
    /// Response headers reported by the store.
    pub headers: HeaderMap,
    /// Remaining body bytes.
    pub body: ByteStream,
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Read access to an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Fetch a whole object.
    ///
    /// Any non-success answer from the store becomes an error carrying the
    /// store's status code and message.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject>;

    /// Start fetching an object and return as soon as status and headers are
    /// known.
    ///
    /// Unlike [`ObjectStore::get_object`], a failure status is not an error:
    /// it is returned as-is together with the store's error body. Errors are
    /// only returned when no status could be obtained at all.
    async fn stream_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStream>;
}

/// Refuse keys with `.` or `..` segments.
///
/// HTTP clients collapse dot segments when building request URLs, which
/// would silently address a different object.
pub(crate) fn check_key(key: &str) -> StoreResult<()> {
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}
