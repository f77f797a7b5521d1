//! Port traits implemented by infrastructure crates.
//!
//! The orchestration layer (`autoapply`) only ever talks to the platform
//! through these traits. That keeps the eligibility rules and the apply
//! scheduler free of HTTP details, and lets tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::{
    ApplyOutcome, CallbackTarget, ReportError, RunId, RunServiceError, RunState, Verdict,
    WorkspaceId, WorkspacePolicy,
};

/// Read and apply runs on the orchestration platform.
///
/// Every method is a single network round trip with no automatic retry.
/// Implementations translate transport responses into typed outcomes so
/// callers never inspect raw status codes.
#[async_trait]
pub trait RunService: Send + Sync {
    /// Fetches the current state of a run.
    async fn fetch_run(&self, run_id: &RunId) -> Result<RunState, RunServiceError>;

    /// Fetches the auto-apply policy of a workspace.
    async fn fetch_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<WorkspacePolicy, RunServiceError>;

    /// Asks the platform to confirm and apply a run.
    ///
    /// A 409 is not an error: it is [`ApplyOutcome::Conflict`], meaning the
    /// run is not confirmable yet. `Err` is reserved for failures where no
    /// response was obtained.
    async fn apply_run(&self, run_id: &RunId) -> Result<ApplyOutcome, RunServiceError>;
}

/// Report a verdict back to the platform for one task result.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    /// Delivers `verdict` to `target`. Called at most once per event.
    async fn report(&self, target: &CallbackTarget, verdict: &Verdict) -> Result<(), ReportError>;
}
