//! Hatchway Server - HTTP update server.
//!
//! This crate provides:
//! - Update checks against release channels (`/status/{channel}/{version}`)
//! - Redirects to a channel's current build (`/latest/{channel}`)
//! - Artifact delivery streamed from object storage (`/build/{build_id}`)
//!
//! All request state is per request; the shared [`AppState`] is immutable
//! after startup.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use artifact::ArtifactProxy;
pub use config::{ConfigError, ServerConfig};
pub use error::{AppError, AppResult};
pub use state::AppState;

/// Run the server with the given configuration.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    run_with_shutdown(config, std::future::pending()).await
}

/// Run the server with graceful shutdown support.
pub async fn run_with_shutdown<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;

    let store = hatchway_store::build_store(&config.store).await?;
    let addr: SocketAddr = config.listen_addr().parse()?;
    let drain_limit = Duration::from_secs(config.shutdown_timeout);
    info!(
        builds = %config.builds.bucket,
        channels = %config.channels.bucket,
        scheme = %config.scheme,
        "Starting Hatchway server on {}",
        addr
    );

    let app = create_router(AppState::new(config, store));
    let listener = TcpListener::bind(addr).await?;
    serve(listener, app, shutdown, drain_limit).await?;

    info!("Server shut down");
    Ok(())
}

/// Serve `app` until `shutdown` resolves, then give open connections at
/// most `drain_limit` to finish before dropping them.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    drain_limit: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let signal = async move {
        shutdown.await;
        let _ = signalled_tx.send(());
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();

    let deadline = async move {
        if signalled_rx.await.is_err() {
            // Server finished without a signal
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(drain_limit).await;
    };

    tokio::select! {
        result = server => result?,
        _ = deadline => {
            warn!(
                "Connections still open {}s after shutdown signal, dropping them",
                drain_limit.as_secs()
            );
        }
    }

    Ok(())
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    create_router_with_state(Arc::new(state))
}

/// Create the application router with an Arc-wrapped state.
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    api::routes()
        .layer(axum::middleware::from_fn(middleware::timing_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn local_listener() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_serve_drops_stuck_connections_after_drain_limit() {
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let started_tx = Arc::new(tokio::sync::Mutex::new(Some(started_tx)));
        let app = Router::new().route(
            "/hang",
            get(move || {
                let started_tx = Arc::clone(&started_tx);
                async move {
                    if let Some(tx) = started_tx.lock().await.take() {
                        let _ = tx.send(());
                    }
                    std::future::pending::<&'static str>().await
                }
            }),
        );

        let (listener, addr) = local_listener().await;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            app,
            async move {
                let _ = stop_rx.await;
            },
            Duration::from_millis(100),
        ));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /hang HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        started_rx.await.unwrap();

        stop_tx.send(()).unwrap();
        let finished = tokio::time::timeout(Duration::from_secs(5), server).await;
        assert!(finished.is_ok(), "serve kept waiting on a stuck request");
        finished.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_serve_returns_promptly_when_idle() {
        let app = Router::new().route("/", get(|| async { "ok" }));
        let (listener, addr) = local_listener().await;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            app,
            async move {
                let _ = stop_rx.await;
            },
            Duration::from_secs(60),
        ));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));

        stop_tx.send(()).unwrap();
        let finished = tokio::time::timeout(Duration::from_secs(5), server).await;
        assert!(finished.is_ok(), "idle server did not stop");
    }
}
