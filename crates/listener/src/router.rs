//! HTTP routes for the run task endpoint.

use autoapply::EventProcessor;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use runtask::{EventId, RunId, RunTaskEvent};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::pool::WorkerPool;
use crate::signature::{SignatureVerifier, SIGNATURE_HEADER};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct ListenerState {
    processor: EventProcessor,
    verifier: SignatureVerifier,
    pool: WorkerPool,
}

impl ListenerState {
    pub fn new(processor: EventProcessor, verifier: SignatureVerifier, pool: WorkerPool) -> Self {
        Self {
            processor,
            verifier,
            pool,
        }
    }
}

/// Builds the router: `POST /` receives events, `GET /healthz` answers probes.
pub fn router(state: ListenerState) -> Router {
    Router::new()
        .route("/", post(receive_event))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Acknowledges the delivery and, unless it is the registration probe, hands
/// it to a worker. The response never waits for the verdict.
async fn receive_event(
    State(state): State<ListenerState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let event = match RunTaskEvent::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "rejected unparseable run task event");
            return StatusCode::BAD_REQUEST;
        }
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    // The signature itself never goes to the log.
    debug!(payload = ?event, signed = signature.is_some(), "received run task event");

    if event.is_test_probe() {
        info!("acknowledged run task registration probe");
        return StatusCode::OK;
    }

    let event_id = EventId::new_random();
    let run_id = event.run_id();
    info!(
        %event_id,
        run_id = run_id.as_ref().map_or("", RunId::as_str),
        "accepted run task event"
    );
    let ListenerState {
        processor,
        verifier,
        pool,
    } = state;
    pool.submit(async move {
        let signature = verifier.verify(&body, signature.as_deref());
        processor.process(event_id, event, signature).await;
    });

    StatusCode::OK
}
