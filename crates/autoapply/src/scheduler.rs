//! The apply scheduler.
//!
//! A single long-lived task drains the [`RunQueueConsumer`]. Every popped run
//! is re-inspected from scratch, because its state may have changed since it
//! was queued:
//!
//! | Observation | Action |
//! |-------------|--------|
//! | run cannot be fetched | drop (logged) |
//! | status `planned_and_finished` | drop: nothing to apply |
//! | status applied / discarded / errored / canceled | drop: can never be confirmed |
//! | not confirmable | requeue at the tail |
//! | confirmable, apply → 202 | drop: applied |
//! | confirmable, apply → 409 | requeue at the tail |
//! | confirmable, apply → anything else | drop (logged) |
//!
//! There is no attempt counter and no maximum wait: a run is polled until it
//! reaches one of the drop rows. When the same run is popped twice in a row
//! (it is the only thing in the queue) the scheduler sleeps for the retry
//! delay first, so a lone waiting run is polled every few seconds instead of
//! in a tight loop. Interleaved distinct runs are processed without delay.
//!
//! The scheduler never reports to the platform. Its outcomes are visible only
//! in logs and in the run's own status.

use std::sync::Arc;
use std::time::Duration;

use runtask::{ApplyOutcome, RunId, RunService, RunStatus};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

use crate::queue::{QueueEntry, RunQueueConsumer};

/// Delay inserted before re-polling the run that was handled in the previous
/// iteration.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Tunables for the [`ApplyScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// What happened to a run in one scheduler iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The platform accepted the apply. The run is dropped.
    Applied,
    /// The plan had no changes. The run is dropped.
    AlreadyFinished,
    /// The run reached a status from which it cannot be confirmed. The run is
    /// dropped.
    Finished(RunStatus),
    /// The run could not be inspected or the apply was refused. The run is
    /// dropped.
    Abandoned,
    /// The run is not ready yet. It went back to the tail of the queue.
    Requeued,
}

impl Disposition {
    /// Returns `true` if the run went back onto the queue.
    pub fn is_requeued(&self) -> bool {
        matches!(self, Disposition::Requeued)
    }
}

/// Single consumer of the apply queue.
pub struct ApplyScheduler {
    service: Arc<dyn RunService>,
    queue: RunQueueConsumer,
    config: SchedulerConfig,
    previous: Option<RunId>,
}

impl ApplyScheduler {
    pub fn new(
        service: Arc<dyn RunService>,
        queue: RunQueueConsumer,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            service,
            queue,
            config,
            previous: None,
        }
    }

    /// Starts the scheduler loop on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run().instrument(tracing::info_span!("apply_scheduler")))
    }

    /// Processes queue entries until the queue is closed.
    pub async fn run(mut self) {
        info!(
            retry_delay_secs = self.config.retry_delay.as_secs_f64(),
            "apply scheduler started"
        );
        while self.step().await.is_some() {}
        warn!("apply queue closed; apply scheduler stopped");
    }

    /// Waits for the next entry and processes it.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn step(&mut self) -> Option<Disposition> {
        let entry = self.queue.recv().await?;
        Some(self.process(entry).await)
    }

    async fn process(&mut self, entry: QueueEntry) -> Disposition {
        let run_id = entry.run_id.clone();
        let span = tracing::info_span!("process_run", run_id = %run_id);

        async {
            if self.previous.as_ref() == Some(&run_id) {
                debug!(
                    delay_secs = self.config.retry_delay.as_secs_f64(),
                    "same run as previous iteration; backing off"
                );
                tokio::time::sleep(self.config.retry_delay).await;
            }
            self.previous = Some(run_id.clone());

            let disposition = self.inspect_and_apply(&run_id).await;
            if disposition.is_requeued() {
                self.queue.requeue(entry);
            } else {
                info!(
                    ?disposition,
                    waited_secs = entry.enqueued_at.seconds_ago(),
                    "run removed from apply queue"
                );
                self.queue.complete(&run_id);
            }
            disposition
        }
        .instrument(span)
        .await
    }

    async fn inspect_and_apply(&self, run_id: &RunId) -> Disposition {
        let state = match self.service.fetch_run(run_id).await {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "failed to get run details");
                return Disposition::Abandoned;
            }
        };

        if state.status.is_planned_and_finished() {
            info!("run planned and finished without changes");
            return Disposition::AlreadyFinished;
        }

        if state.status.is_terminal() {
            info!(status = ?state.status, "run can no longer be confirmed");
            return Disposition::Finished(state.status);
        }

        if !state.is_confirmable {
            debug!(status = ?state.status, "still waiting for the run to ask for confirmation");
            return Disposition::Requeued;
        }

        match self.service.apply_run(run_id).await {
            Ok(ApplyOutcome::Accepted) => {
                info!("run apply accepted");
                Disposition::Applied
            }
            Ok(ApplyOutcome::Conflict) => {
                debug!("apply returned conflict; run not confirmable yet");
                Disposition::Requeued
            }
            Ok(ApplyOutcome::Rejected { status, body }) => {
                error!(status, body = %body, "unexpected apply response");
                Disposition::Abandoned
            }
            Err(err) => {
                error!(error = %err, "apply request failed");
                Disposition::Abandoned
            }
        }
    }
}
