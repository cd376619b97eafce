//! Integration tests for the hatchway-server routes.
//!
//! Every test drives the full router (middleware included) against an
//! in-memory object store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, header};
use hatchway_server::{AppState, ServerConfig, create_router};
use hatchway_store::{MemoryFailure, MemoryStore};
use hatchway_update::{BucketLocation, Scheme};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const BUILDS: &str = "hatchway-builds";
const CHANNELS: &str = "hatchway-channels";
const DESCRIPTOR_KEY: &str = "meta/stable/latest.json";

fn config() -> ServerConfig {
    ServerConfig {
        builds: BucketLocation::new(BUILDS, "releases/"),
        channels: BucketLocation::new(CHANNELS, "meta"),
        ..ServerConfig::default()
    }
}

fn descriptor() -> Value {
    json!({
        "version": "3.4.0",
        "build": "app-3.4.0.zip",
        "notes": "Bug fixes",
        "pub_date": "2017-04-20T14:17:23-0700"
    })
}

fn store_with_descriptor(body: &Value) -> MemoryStore {
    MemoryStore::new().with_object(CHANNELS, DESCRIPTOR_KEY, body.to_string())
}

fn app(store: Arc<MemoryStore>) -> Router {
    create_router(AppState::new(config(), store))
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder()
        .uri(uri)
        .header(header::HOST, "updates.example.com")
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ============================================================================
// STATUS ENDPOINT
// ============================================================================

mod status {
    use super::*;

    #[tokio::test]
    async fn test_update_available() {
        let store = Arc::new(store_with_descriptor(&descriptor()));
        let response = get(app(store), "/status/stable/3.3.9").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let payload: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            payload,
            json!({
                "name": "3.4.0",
                "notes": "Bug fixes",
                "pub_date": "2017-04-20T14:17:23-0700",
                "url": "http://updates.example.com/build/app-3.4.0.zip"
            })
        );
    }

    #[tokio::test]
    async fn test_optional_fields_omitted() {
        let store = Arc::new(store_with_descriptor(&json!({
            "version": "v2.0.0",
            "build": "app-2.0.0.zip"
        })));
        let response = get(app(store), "/status/stable/1.0.0").await;

        assert_eq!(response.status(), StatusCode::OK);
        let payload: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload["name"], "v2.0.0");
        assert!(payload.get("notes").is_none());
        assert!(payload.get("pub_date").is_none());
    }

    #[tokio::test]
    async fn test_https_scheme_in_url() {
        let mut config = config();
        config.scheme = Scheme::Https;
        let store = Arc::new(store_with_descriptor(&descriptor()));
        let app = create_router(AppState::new(config, store));

        let response = get(app, "/status/stable/0.1.0").await;
        let payload: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload["url"], "https://updates.example.com/build/app-3.4.0.zip");
    }

    #[tokio::test]
    async fn test_no_update_when_current_or_ahead() {
        for version in ["3.4.0", "v3.4.0", "3.4.1", "4.0.0", "3.4.0+build.7"] {
            let store = Arc::new(store_with_descriptor(&descriptor()));
            let response = get(app(store), &format!("/status/stable/{version}")).await;

            assert_eq!(response.status(), StatusCode::NO_CONTENT, "version {version}");
            assert!(body_text(response).await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_prerelease_of_latest_gets_update() {
        let store = Arc::new(store_with_descriptor(&descriptor()));
        let response = get(app(store), "/status/stable/3.4.0-beta.1").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_version_rejected_before_store() {
        let store = Arc::new(store_with_descriptor(&descriptor()));
        let response = get(app(Arc::clone(&store)), "/status/stable/not-a-version").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "invalid version");
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_channel_passes_store_status() {
        let store = Arc::new(MemoryStore::new());
        let response = get(app(store), "/status/nightly/1.0.0").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "The specified key does not exist.");
    }

    #[tokio::test]
    async fn test_store_denial_passes_status() {
        let store = Arc::new(MemoryStore::new().with_failure(
            CHANNELS,
            DESCRIPTOR_KEY,
            MemoryFailure {
                status: Some(403),
                message: "Access Denied".to_string(),
            },
        ));
        let response = get(app(store), "/status/stable/1.0.0").await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Access Denied");
    }

    #[tokio::test]
    async fn test_store_failure_without_status_is_500() {
        let store = Arc::new(MemoryStore::new().with_failure(
            CHANNELS,
            DESCRIPTOR_KEY,
            MemoryFailure {
                status: None,
                message: "connection reset by peer".to_string(),
            },
        ));
        let response = get(app(store), "/status/stable/1.0.0").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "connection reset by peer");
    }

    #[tokio::test]
    async fn test_bad_version_data_is_500() {
        let store = Arc::new(store_with_descriptor(&json!({
            "version": "three",
            "build": "app.zip"
        })));
        let response = get(app(store), "/status/stable/1.0.0").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            "bad version data in channel stable: three"
        );
    }

    #[tokio::test]
    async fn test_bad_build_data_is_500() {
        let store = Arc::new(store_with_descriptor(&json!({ "version": "1.2.3" })));
        let response = get(app(store), "/status/stable/1.0.0").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "bad build data for stable");
    }

    #[tokio::test]
    async fn test_non_json_descriptor_is_500() {
        let store = Arc::new(MemoryStore::new().with_object(CHANNELS, DESCRIPTOR_KEY, "<html>"));
        let response = get(app(store), "/status/stable/1.0.0").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body_text(response)
                .await
                .starts_with("bad data in channel stable:")
        );
    }

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let store = Arc::new(store_with_descriptor(&descriptor()));
        let app = app(Arc::clone(&store));

        let first = body_text(get(app.clone(), "/status/stable/1.0.0").await).await;
        let second = body_text(get(app, "/status/stable/1.0.0").await).await;

        assert_eq!(first, second);
        assert_eq!(store.request_count(), 2);
    }
}

// ============================================================================
// LATEST ENDPOINT
// ============================================================================

mod latest {
    use super::*;

    #[tokio::test]
    async fn test_redirects_permanently_to_build() {
        let store = Arc::new(store_with_descriptor(&descriptor()));
        let response = get(app(store), "/latest/stable").await;

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://updates.example.com/build/app-3.4.0.zip"
        );
    }

    #[tokio::test]
    async fn test_missing_channel_passes_store_status() {
        let store = Arc::new(MemoryStore::new());
        let response = get(app(store), "/latest/nightly").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.headers().contains_key(header::LOCATION));
    }

    #[tokio::test]
    async fn test_bad_channel_data_is_500() {
        let store = Arc::new(store_with_descriptor(&json!({ "build": "app.zip" })));
        let response = get(app(store), "/latest/stable").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "bad version data in channel stable: ");
    }
}

// ============================================================================
// BUILD ENDPOINT
// ============================================================================

mod build {
    use super::*;

    fn artifact_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
        headers.insert(header::ETAG, HeaderValue::from_static("\"9b2cf535f27731c974343645a3985328\""));
        headers.insert(
            HeaderName::from_static("x-amz-request-id"),
            HeaderValue::from_static("4442587FB7D0A2F9"),
        );
        headers.insert(
            HeaderName::from_bytes(b"Body").unwrap(),
            HeaderValue::from_static("[object]"),
        );
        headers.insert(
            HeaderName::from_bytes(b"Metadata").unwrap(),
            HeaderValue::from_static("{}"),
        );
        headers
    }

    #[tokio::test]
    async fn test_streams_artifact_with_store_headers() {
        let store = Arc::new(MemoryStore::new().with_response(
            BUILDS,
            "releases/app-3.4.0.zip",
            StatusCode::OK,
            artifact_headers(),
            "PK\u{3}\u{4}zip contents",
        ));
        let response = get(app(store), "/build/app-3.4.0.zip").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert_eq!(headers[header::ETAG], "\"9b2cf535f27731c974343645a3985328\"");
        assert_eq!(headers["x-amz-request-id"], "4442587FB7D0A2F9");
        assert!(!headers.contains_key("body"));
        assert!(!headers.contains_key("metadata"));

        assert_eq!(body_text(response).await, "PK\u{3}\u{4}zip contents");
    }

    #[tokio::test]
    async fn test_large_artifact_streams_completely() {
        let contents = vec![7u8; 200 * 1024];
        let store = Arc::new(MemoryStore::new().with_object(
            BUILDS,
            "releases/big.zip",
            contents.clone(),
        ));
        let response = get(app(store), "/build/big.zip").await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.len(), contents.len());
    }

    #[tokio::test]
    async fn test_build_id_cannot_leave_build_prefix() {
        let store = Arc::new(
            MemoryStore::new()
                .with_object(BUILDS, "releases/../secret.txt", "leaked")
                .with_object(BUILDS, "secret.txt", "leaked"),
        );

        for uri in ["/build/..%2Fsecret.txt", "/build/..", "/build/%2E%2E", "/build/a%2F..%2F..%2Fsecret.txt"] {
            let response = get(app(Arc::clone(&store)), uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert!(!body_text(response).await.contains("leaked"), "{uri}");
        }
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_artifact_passes_404() {
        let store = Arc::new(MemoryStore::new());
        let response = get(app(store), "/build/gone.zip").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_store_failure_without_status_is_500() {
        let store = Arc::new(MemoryStore::new().with_failure(
            BUILDS,
            "releases/app.zip",
            MemoryFailure {
                status: None,
                message: "connection refused".to_string(),
            },
        ));
        let response = get(app(store), "/build/app.zip").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "connection refused");
    }
}

// ============================================================================
// MISC
// ============================================================================

mod misc {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let response = get(app(Arc::new(MemoryStore::new())), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let health: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health["status"], "healthy");
    }

    #[tokio::test]
    async fn test_request_id_echoed_or_generated() {
        let app = app(Arc::new(MemoryStore::new()));

        let response = get(app.clone(), "/health").await;
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-response-time"));

        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = get(app(Arc::new(MemoryStore::new())), "/status/stable").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_host_falls_back_to_port() {
        let store = Arc::new(store_with_descriptor(&descriptor()));
        let request = Request::builder()
            .uri("/latest/stable")
            .body(Body::empty())
            .unwrap();
        let response = app(store).oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::LOCATION],
            "http://localhost:3000/build/app-3.4.0.zip"
        );
    }
}
