//! tfc-autoapply entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: command-line options plus the two secrets
//!    (`HMAC_SECRET`, `TFC_API_TOKEN`) from the mounted secrets file or the
//!    environment. A missing secret stops startup.
//! 2. **Wire observability**: configure `tracing-subscriber` with a text or
//!    JSON layer and, when an OTLP endpoint is configured, an OpenTelemetry
//!    exporter.
//! 3. **Construct infrastructure**: one [`tfc::TfcClient`] serves as both the
//!    [`runtask::RunService`] and the [`runtask::ResultReporter`].
//! 4. **Start the scheduler**: the single [`autoapply::ApplyScheduler`] runs
//!    as a background task for the life of the process.
//! 5. **Serve**: the HTTP listener runs until SIGINT or SIGTERM.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use autoapply::{run_queue, ApplyScheduler, EligibilityEngine, EventProcessor};
use clap::Parser;
use listener::{ListenerState, SignatureVerifier, WorkerPool};
use tfc::TfcClient;
use tracing::{error, info};

use crate::config::{Cli, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(cli.log_format)?;

    let result = run(&cli).await;
    if let Err(err) = &result {
        error!(error = ?err, "tfc-autoapply stopped");
    }

    telemetry.shutdown();
    result
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::resolve(cli).context("invalid configuration")?;
    info!(
        listen = %config.listen,
        tfc_base_url = %config.tfc.base_url,
        secrets = %config.secrets_origin,
        retry_delay_secs = config.scheduler.retry_delay.as_secs(),
        max_concurrent_events = config.max_concurrent_events,
        "starting tfc-autoapply"
    );

    let client = Arc::new(TfcClient::new(config.tfc.clone()).context("failed to build platform client")?);

    let (queue, consumer) = run_queue();
    let scheduler = ApplyScheduler::new(client.clone(), consumer, config.scheduler.clone()).spawn();

    let processor = EventProcessor::new(EligibilityEngine::new(client.clone()), queue, client);
    let state = ListenerState::new(
        processor,
        SignatureVerifier::new(config.hmac_secret.expose()),
        WorkerPool::new(config.max_concurrent_events),
    );

    listener::serve(config.listen, state, shutdown_signal()).await?;

    scheduler.abort();
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
