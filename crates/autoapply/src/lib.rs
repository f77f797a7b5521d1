//! Run task orchestration: eligibility, apply queue, and apply scheduler.
//!
//! This crate turns a "run has planned" event into a confirmed apply:
//!
//! 1. [`intake::EventProcessor`] takes an authenticated (or rejected) event,
//!    asks the [`eligibility::EligibilityEngine`] for a decision, pushes the
//!    run onto the [`queue::RunQueue`] when the decision says so, and reports
//!    the verdict once through the [`runtask::ResultReporter`].
//! 2. [`scheduler::ApplyScheduler`] is the single consumer of the queue. It
//!    polls each run until the platform accepts the apply, the run resolves on
//!    its own, or a hard failure makes further polling pointless.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Everything here sequences calls to the
//! [`runtask::RunService`] and [`runtask::ResultReporter`] ports. No HTTP
//! types appear in this crate.

pub mod eligibility;
pub mod intake;
pub mod queue;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use eligibility::{Decision, EligibilityEngine};
pub use intake::{EventProcessor, IntakeOutcome, Signature};
pub use queue::{run_queue, Enqueued, QueueClosed, QueueEntry, RunQueue, RunQueueConsumer};
pub use scheduler::{ApplyScheduler, Disposition, SchedulerConfig, DEFAULT_RETRY_DELAY};
