//! Amazon S3 (and S3-compatible) backend.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::interceptors::BeforeDeserializationInterceptorContextRef;
use aws_sdk_s3::config::{ConfigBag, Intercept, Region, RuntimeComponents};
use aws_sdk_s3::error::{BoxError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
use aws_sdk_s3::primitives::ByteStream as SdkByteStream;
use bytes::Bytes;
use futures::{StreamExt, stream};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::S3Config;
use crate::error::{StoreError, StoreResult};
use crate::object::{ByteStream, ObjectStore, ObjectStream, StoredObject, check_key};

/// Region used when neither the configuration nor the AWS environment
/// names one.
const FALLBACK_REGION: &str = "us-east-1";

type GetObjectSdkError = SdkError<GetObjectError, HttpResponse>;

/// Object store backed by the AWS SDK.
///
/// Credentials and region come from the default AWS provider chain
/// (environment, shared config files, SSO, container and instance roles).
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Load the AWS environment and build a client for `config`.
    pub async fn connect(config: &S3Config) -> StoreResult<Self> {
        if let Some(endpoint) = &config.endpoint {
            let valid = endpoint
                .parse::<http::Uri>()
                .map(|uri| uri.scheme().is_some() && uri.host().is_some())
                .unwrap_or(false);
            if !valid {
                return Err(StoreError::Config {
                    message: format!("bad S3 endpoint {}", endpoint),
                });
            }
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if shared.region().is_none() {
            builder = builder.region(Region::new(FALLBACK_REGION));
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::from_client(Client::from_conf(builder.build())))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the region requests are signed for.
    pub fn region(&self) -> Option<&str> {
        self.client.config().region().map(|r| r.as_ref())
    }

    async fn send_get(
        &self,
        bucket: &str,
        key: &str,
    ) -> (Result<GetObjectOutput, GetObjectSdkError>, Option<HeaderMap>) {
        debug!(bucket, key, "S3 GetObject");

        let captured = CapturedHeaders::default();
        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .customize()
            .interceptor(captured.clone())
            .send()
            .await;

        (result, captured.take())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        check_key(key)?;
        let (result, headers) = self.send_get(bucket, key).await;
        let output = result.map_err(into_store_error)?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
            .into_bytes();

        Ok(StoredObject {
            status: StatusCode::OK,
            headers: headers.unwrap_or_default(),
            body,
        })
    }

    async fn stream_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStream> {
        check_key(key)?;
        let (result, headers) = self.send_get(bucket, key).await;

        match result {
            Ok(output) => Ok(ObjectStream {
                status: StatusCode::OK,
                headers: headers.unwrap_or_default(),
                body: body_stream(output.body),
            }),
            Err(err) => relay_error(err, bucket, key),
        }
    }
}

/// Pass a failed response through unchanged, or fail when S3 never answered.
fn relay_error(err: GetObjectSdkError, bucket: &str, key: &str) -> StoreResult<ObjectStream> {
    let relayed = err.raw_response().map(|raw| {
        (
            StatusCode::from_u16(raw.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            header_map(raw.headers().iter()),
            raw.body().bytes().map(Bytes::copy_from_slice),
        )
    });

    let Some((status, headers, body)) = relayed else {
        return Err(into_store_error(err));
    };
    let body = body.unwrap_or_else(|| {
        debug!(bucket, key, %status, "S3 error body unavailable, relaying message");
        Bytes::from(into_store_error(err).to_string())
    });

    Ok(ObjectStream {
        status,
        headers,
        body: stream::once(async move { Ok(body) }).boxed(),
    })
}

/// Captures the raw response headers of a request as they arrive.
///
/// The SDK only exposes typed fields on success, so this is the way to
/// relay every header S3 sent.
#[derive(Debug, Clone, Default)]
struct CapturedHeaders(Arc<Mutex<Option<HeaderMap>>>);

impl CapturedHeaders {
    fn take(&self) -> Option<HeaderMap> {
        self.0.lock().take()
    }
}

impl Intercept for CapturedHeaders {
    fn name(&self) -> &'static str {
        "CapturedHeaders"
    }

    fn read_before_deserialization(
        &self,
        context: &BeforeDeserializationInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let headers = header_map(context.response().headers().iter());
        *self.0.lock() = Some(headers);
        Ok(())
    }
}

/// Convert raw header pairs, skipping any that are not valid HTTP.
fn header_map<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    headers
}

fn body_stream(body: SdkByteStream) -> ByteStream {
    stream::unfold(body, |mut body| async move {
        let chunk = body.next().await?;
        Some((chunk.map_err(|e| StoreError::Io(std::io::Error::other(e))), body))
    })
    .boxed()
}

/// Map an SDK failure to a store error, keeping the HTTP status when S3
/// answered at all.
fn into_store_error(err: GetObjectSdkError) -> StoreError {
    match err.raw_response().map(|raw| raw.status().as_u16()) {
        Some(status) => status_error(status, err.code(), err.message()),
        None => StoreError::Network {
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}

/// Build a status error, falling back to the reason phrase for the message.
fn status_error(status: u16, code: Option<&str>, message: Option<&str>) -> StoreError {
    let message = message
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| status.to_string());

    StoreError::Status {
        status,
        code: code.map(str::to_string),
        message,
    }
}
