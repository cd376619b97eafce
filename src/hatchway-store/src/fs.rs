//! Local filesystem backend.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, LAST_MODIFIED};
use http::{HeaderMap, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectStore, ObjectStream, StoredObject};

const OCTET_STREAM: &str = "application/octet-stream";

/// Object store rooted at a local directory.
///
/// Bucket `b` and key `k` map to `<root>/b/k`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object to a path, refusing anything that could leave the
    /// bucket directory.
    fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        let mut path = self.root.clone();
        for part in [bucket, key] {
            let relative = Path::new(part);
            let is_plain = relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if part.is_empty() || !is_plain {
                return Err(StoreError::InvalidKey {
                    key: part.to_string(),
                });
            }
            path.push(relative);
        }
        Ok(path)
    }

    /// Open a regular file for an object.
    ///
    /// Missing paths and anything that is not a regular file (such as a
    /// directory sitting where a key would be) count as absent.
    async fn open(&self, bucket: &str, key: &str) -> StoreResult<Option<(File, Metadata)>> {
        let path = self.object_path(bucket, key)?;
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Ok(None);
        }
        Ok(Some((file, metadata)))
    }
}

fn metadata_headers(metadata: &Metadata) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    if let Ok(modified) = metadata.modified() {
        let modified: DateTime<Utc> = modified.into();
        let value = modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(LAST_MODIFIED, value);
        }
    }
    headers
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        let Some((mut file, metadata)) = self.open(bucket, key).await? else {
            return Err(StoreError::no_such_key());
        };

        let mut body = Vec::with_capacity(metadata.len() as usize);
        file.read_to_end(&mut body).await?;

        Ok(StoredObject {
            status: StatusCode::OK,
            headers: metadata_headers(&metadata),
            body: Bytes::from(body),
        })
    }

    async fn stream_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStream> {
        let Some((file, metadata)) = self.open(bucket, key).await? else {
            return Ok(not_found_stream());
        };

        Ok(ObjectStream {
            status: StatusCode::OK,
            headers: metadata_headers(&metadata),
            body: ReaderStream::new(file).map_err(StoreError::from).boxed(),
        })
    }
}

/// The 404 answer for a missing object, in the same shape a remote store
/// would give it.
fn not_found_stream() -> ObjectStream {
    let message = StoreError::no_such_key().to_string();
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(message.len()));

    ObjectStream {
        status: StatusCode::NOT_FOUND,
        headers,
        body: stream::once(async move { Ok(Bytes::from(message)) }).boxed(),
    }
}
