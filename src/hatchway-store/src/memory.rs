//! In-memory backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, StatusCode};

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectStore, ObjectStream, StoredObject, check_key};

/// Chunk size used when streaming memory objects.
const CHUNK_SIZE: usize = 64 * 1024;

/// A failure a [`MemoryStore`] reports for a given object.
#[derive(Debug, Clone)]
pub struct MemoryFailure {
    /// Status to report, or `None` for a transport-level failure.
    pub status: Option<u16>,
    pub message: String,
}

impl MemoryFailure {
    fn to_error(&self) -> StoreError {
        match self.status {
            Some(status) => StoreError::Status {
                status,
                code: None,
                message: self.message.clone(),
            },
            None => StoreError::Io(std::io::Error::other(self.message.clone())),
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Object {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    Failure(MemoryFailure),
}

/// Object store holding a fixed set of objects in memory.
///
/// Objects are registered up front with the builder methods; the store is
/// read-only once shared. Every request is counted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<(String, String), Entry>,
    requests: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object with a generic content type.
    pub fn with_object(self, bucket: &str, key: &str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        self.with_response(bucket, key, StatusCode::OK, headers, body)
    }

    /// Add a raw response: any status and header set, returned as-is.
    pub fn with_response(
        mut self,
        bucket: &str,
        key: &str,
        status: StatusCode,
        mut headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> Self {
        let body = body.into();
        if !headers.contains_key(CONTENT_LENGTH) && status.is_success() {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }
        self.entries.insert(
            (bucket.to_string(), key.to_string()),
            Entry::Object {
                status,
                headers,
                body,
            },
        );
        self
    }

    /// Make requests for an object fail.
    pub fn with_failure(mut self, bucket: &str, key: &str, failure: MemoryFailure) -> Self {
        self.entries
            .insert((bucket.to_string(), key.to_string()), Entry::Failure(failure));
        self
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn lookup(&self, bucket: &str, key: &str) -> Option<&Entry> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.entries.get(&(bucket.to_string(), key.to_string()))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        check_key(key)?;
        match self.lookup(bucket, key) {
            Some(Entry::Object {
                status,
                headers,
                body,
            }) if status.is_success() => Ok(StoredObject {
                status: *status,
                headers: headers.clone(),
                body: body.clone(),
            }),
            Some(Entry::Object { status, body, .. }) => Err(StoreError::Status {
                status: status.as_u16(),
                code: None,
                message: String::from_utf8_lossy(body).into_owned(),
            }),
            Some(Entry::Failure(failure)) => Err(failure.to_error()),
            None => Err(StoreError::no_such_key()),
        }
    }

    async fn stream_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStream> {
        check_key(key)?;
        match self.lookup(bucket, key) {
            Some(Entry::Object {
                status,
                headers,
                body,
            }) => Ok(ObjectStream {
                status: *status,
                headers: headers.clone(),
                body: chunked(body.clone()),
            }),
            Some(Entry::Failure(failure)) => match failure.status {
                Some(status) => Ok(ObjectStream {
                    status: StatusCode::from_u16(status)
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    headers: text_headers(),
                    body: chunked(Bytes::from(failure.message.clone())),
                }),
                None => Err(failure.to_error()),
            },
            None => Ok(ObjectStream {
                status: StatusCode::NOT_FOUND,
                headers: text_headers(),
                body: chunked(Bytes::from(StoreError::no_such_key().to_string())),
            }),
        }
    }
}

fn text_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    headers
}

fn chunked(body: Bytes) -> crate::object::ByteStream {
    let chunks: Vec<StoreResult<Bytes>> = (0..body.len())
        .step_by(CHUNK_SIZE)
        .map(|start| Ok(body.slice(start..(start + CHUNK_SIZE).min(body.len()))))
        .collect();
    stream::iter(chunks).boxed()
}
