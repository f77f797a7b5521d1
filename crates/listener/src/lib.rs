//! Run task event source infrastructure.
//!
//! Binds an HTTP server that receives run task events from the platform,
//! acknowledges every delivery immediately, and hands accepted events to a
//! bounded pool of per-event workers:
//!
//! - [`router`]: the axum routes (`POST /` for events, `GET /healthz`).
//! - [`signature`]: HMAC-SHA512 verification of the raw request body against
//!   the `X-TFC-Task-Signature` header.
//! - [`pool`]: semaphore-bounded task submission so a burst of deliveries
//!   cannot spawn unbounded concurrent work.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details and signature checking live here.
//! The [`autoapply`] crate sees only parsed [`runtask::RunTaskEvent`]s and a
//! [`autoapply::Signature`] result.

pub mod pool;
pub mod router;
pub mod signature;

use std::future::Future;
use std::net::SocketAddr;

use thiserror::Error;
use tracing::info;

pub use pool::WorkerPool;
pub use router::{router, ListenerState};
pub use signature::{SignatureVerifier, SIGNATURE_HEADER};

/// Failures starting or running the HTTP server.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Serves the run task endpoint on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: ListenerState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ListenerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;
    info!(%addr, "listening for run task events");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ListenerError::Serve)
}
