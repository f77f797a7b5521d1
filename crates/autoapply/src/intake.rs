//! Event intake: one authenticated event in, one verdict out.
//!
//! [`EventProcessor::process`] is the body of the per-event worker. It runs
//! after the listener has already acknowledged the delivery, so nothing it
//! does is visible to the sender except through the task result callback.

use std::sync::Arc;

use runtask::{EventId, ReportError, ResultReporter, RunId, RunTaskEvent, TaskResultId, Verdict};
use tracing::{error, info, warn, Instrument};

use crate::eligibility::{Decision, EligibilityEngine};
use crate::queue::{Enqueued, RunQueue};

pub const INVALID_SIGNATURE: &str = "invalid HMAC";

/// Result of checking the delivery signature, computed by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Valid,
    Invalid,
}

/// What the processor did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// The event carried no callback target, so there was nothing to report.
    NothingToReport,
    /// The verdict was delivered.
    Reported(Verdict),
    /// The verdict could not be delivered. Not retried.
    ReportFailed { verdict: Verdict, error: ReportError },
}

/// Authenticates, evaluates, schedules, and reports a single event.
#[derive(Clone)]
pub struct EventProcessor {
    engine: EligibilityEngine,
    queue: RunQueue,
    reporter: Arc<dyn ResultReporter>,
}

impl EventProcessor {
    pub fn new(engine: EligibilityEngine, queue: RunQueue, reporter: Arc<dyn ResultReporter>) -> Self {
        Self {
            engine,
            queue,
            reporter,
        }
    }

    /// Processes one event to completion, reporting exactly one verdict when
    /// the event names a callback target.
    pub async fn process(
        &self,
        event_id: EventId,
        event: RunTaskEvent,
        signature: Signature,
    ) -> IntakeOutcome {
        let run_id = event.run_id();
        let task_result_id = event.task_result_id();
        let span = tracing::info_span!(
            "process_event",
            %event_id,
            run_id = run_id.as_ref().map_or("", RunId::as_str),
            task_result_id = task_result_id.as_ref().map_or("", TaskResultId::as_str),
        );
        self.process_inner(event, signature).instrument(span).await
    }

    async fn process_inner(&self, event: RunTaskEvent, signature: Signature) -> IntakeOutcome {
        let (target, verdict) = match signature {
            Signature::Invalid => {
                warn!("event signature does not match");
                let Some(target) = event.callback_target() else {
                    return IntakeOutcome::NothingToReport;
                };
                (target, Verdict::failed(INVALID_SIGNATURE))
            }
            Signature::Valid => match self.engine.evaluate(&event).await {
                Decision::Skip => return IntakeOutcome::NothingToReport,
                Decision::Report {
                    target,
                    verdict,
                    schedule: None,
                } => (target, verdict),
                Decision::Report {
                    target,
                    verdict,
                    schedule: Some(run_id),
                } => match self.queue.enqueue(run_id) {
                    Ok(Enqueued::Added) => {
                        info!("run added to the apply queue");
                        (target, verdict)
                    }
                    Ok(Enqueued::AlreadyPending) => {
                        info!("run already waiting in the apply queue");
                        (target, verdict)
                    }
                    Err(err) => {
                        error!(error = %err, "failed to queue run");
                        (target, Verdict::failed(err.to_string()))
                    }
                },
            },
        };

        match self.reporter.report(&target, &verdict).await {
            Ok(()) => {
                info!(status = %verdict.status, message = %verdict.message, "verdict reported");
                IntakeOutcome::Reported(verdict)
            }
            Err(error) => {
                error!(error = %error, "failed to report verdict");
                IntakeOutcome::ReportFailed { verdict, error }
            }
        }
    }
}
