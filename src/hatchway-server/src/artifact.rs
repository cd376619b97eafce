//! Artifact delivery: relays build objects from the store to the client.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use hatchway_store::{ObjectStore, ObjectStream, StoreError, StoreResult};
use hatchway_update::BucketLocation;
use tracing::{debug, error, warn};

/// Store-internal fields that must never be sent as HTTP headers.
pub const STRIPPED_HEADERS: [&str; 2] = ["body", "metadata"];

/// Streams build artifacts straight through from object storage.
///
/// The proxy is transparent: whatever status the store answers with is what
/// the client gets.
#[derive(Debug, Clone)]
pub struct ArtifactProxy {
    store: Arc<dyn ObjectStore>,
    location: BucketLocation,
}

impl ArtifactProxy {
    /// Create a proxy serving artifacts from `location`.
    pub fn new(store: Arc<dyn ObjectStore>, location: BucketLocation) -> Self {
        Self { store, location }
    }

    /// Object key of a build.
    pub fn artifact_key(&self, build_id: &str) -> String {
        self.location.key(build_id)
    }

    /// Fetch a build and turn it into a streaming response.
    ///
    /// Fails only when the store could not produce a status at all.
    pub async fn stream(&self, build_id: &str) -> StoreResult<Response> {
        let bucket = self.location.bucket.as_str();
        if !is_plain_build_id(build_id) {
            warn!(build_id, bucket, "Rejected build id outside the build prefix");
            return Err(StoreError::InvalidKey {
                key: build_id.to_string(),
            });
        }
        let key = self.artifact_key(build_id);

        let object = self
            .store
            .stream_object(bucket, &key)
            .await
            .inspect_err(|e| {
                error!(build_id, bucket, key = %key, error = %e, "Failed to fetch artifact");
            })?;

        if object.status != StatusCode::OK {
            error!(
                build_id,
                bucket,
                key = %key,
                status = %object.status,
                "Store answered artifact request with non-200 status"
            );
        } else {
            debug!(build_id, bucket, key = %key, "Streaming artifact");
        }

        Ok(relay(object))
    }
}

/// A build id must name a single object directly under the build prefix.
fn is_plain_build_id(build_id: &str) -> bool {
    !build_id.is_empty()
        && build_id != "."
        && build_id != ".."
        && !build_id.contains(['/', '\\'])
}

/// Build a response from a store answer.
///
/// Status and headers are fixed on the response head before the body
/// stream is attached, so nothing about them can change once bytes flow.
pub fn relay(object: ObjectStream) -> Response {
    let ObjectStream {
        status,
        headers,
        body,
    } = object;

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = forwarded_headers(&headers);
    response
}

/// Copy every header except the stripped store-internal fields.
pub fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let stripped = STRIPPED_HEADERS
            .iter()
            .any(|s| name.as_str().eq_ignore_ascii_case(s));
        if !stripped {
            forwarded.append(name.clone(), value.clone());
        }
    }
    forwarded
}
