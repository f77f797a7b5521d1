//! Shared value types for the run task domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! state fetched from the platform (run and workspace snapshots) or produced by
//! the run task itself (verdicts). Run and workspace snapshots are transient:
//! they are re-fetched every time they are needed because the platform can
//! change them between two polls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::WorkspaceId;

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Lifecycle status of a run as reported by the platform.
///
/// Only the statuses the run task reasons about are modelled individually;
/// anything else deserialises to [`RunStatus::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Fetching,
    Queuing,
    PlanQueued,
    Planning,
    Planned,
    CostEstimating,
    CostEstimated,
    PolicyChecking,
    PolicyOverride,
    PolicySoftFailed,
    PolicyChecked,
    PostPlanRunning,
    PostPlanCompleted,
    PlannedAndFinished,
    PlannedAndSaved,
    Confirmed,
    ApplyQueued,
    Applying,
    Applied,
    Discarded,
    Errored,
    Canceled,
    ForceCanceled,
    #[serde(other)]
    Other,
}

impl RunStatus {
    /// Returns `true` when the plan produced no changes and the run finished
    /// without needing an apply.
    pub fn is_planned_and_finished(self) -> bool {
        self == RunStatus::PlannedAndFinished
    }

    /// Returns `true` for statuses from which a run can never become
    /// confirmable again.
    ///
    /// [`RunStatus::PlannedAndFinished`] is reported separately through
    /// [`RunStatus::is_planned_and_finished`].
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Applied
                | RunStatus::Discarded
                | RunStatus::Errored
                | RunStatus::Canceled
                | RunStatus::ForceCanceled
        )
    }
}

// ---------------------------------------------------------------------------

/// What started a run.
///
/// Only [`RunSource::RunTrigger`] runs are candidates for auto-apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunSource {
    /// Started by a run trigger after another workspace's successful apply
    /// (`tfe-run-trigger`).
    RunTrigger,
    /// Started by a VCS push or configuration version upload
    /// (`tfe-configuration-version`).
    Vcs,
    /// Started from the platform UI (`tfe-ui`).
    Ui,
    /// Any other source string (API, CLI, ...), kept verbatim for logging.
    Other(String),
}

impl RunSource {
    /// Returns the platform's wire value for this source.
    pub fn as_str(&self) -> &str {
        match self {
            RunSource::RunTrigger => "tfe-run-trigger",
            RunSource::Vcs => "tfe-configuration-version",
            RunSource::Ui => "tfe-ui",
            RunSource::Other(s) => s,
        }
    }

    /// Returns `true` if the run was started by another workspace's run.
    pub fn is_run_trigger(&self) -> bool {
        matches!(self, RunSource::RunTrigger)
    }
}

impl From<String> for RunSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "tfe-run-trigger" => RunSource::RunTrigger,
            "tfe-configuration-version" => RunSource::Vcs,
            "tfe-ui" => RunSource::Ui,
            _ => RunSource::Other(value),
        }
    }
}

impl From<RunSource> for String {
    fn from(value: RunSource) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for RunSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Snapshot of a run, fetched once per poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    /// Current lifecycle status.
    pub status: RunStatus,

    /// Whether the platform will currently accept a confirmation (apply) action.
    pub is_confirmable: bool,

    /// What started the run.
    pub source: RunSource,

    /// Workspace the run belongs to.
    pub workspace_id: WorkspaceId,
}

// ---------------------------------------------------------------------------

/// The workspace settings the run task consults before scheduling an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspacePolicy {
    /// Whether the workspace operator opted into applying runs without manual
    /// confirmation.
    pub auto_apply: bool,
}

// ---------------------------------------------------------------------------

/// Outcome of asking the platform to apply a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The platform accepted the apply (HTTP 202) and has begun applying.
    Accepted,
    /// The run is not yet in a confirmable state (HTTP 409); try again later.
    Conflict,
    /// Any other response. Not retried.
    Rejected {
        /// HTTP status code returned by the platform.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Pass/fail status of a task result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Passed,
    Failed,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictStatus::Passed => f.write_str("passed"),
            VerdictStatus::Failed => f.write_str("failed"),
        }
    }
}

/// The result the run task reports back for one inbound event.
///
/// Exactly one verdict is produced per event and it is reported once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub message: String,
}

impl Verdict {
    /// Creates a passing verdict.
    pub fn passed(message: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Passed,
            message: message.into(),
        }
    }

    /// Creates a failing verdict.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Failed,
            message: message.into(),
        }
    }

    /// Returns `true` if this verdict passes the run task.
    pub fn is_passed(&self) -> bool {
        self.status == VerdictStatus::Passed
    }
}

// ---------------------------------------------------------------------------
// Secrets and callbacks
// ---------------------------------------------------------------------------

/// A bearer token that must never appear in logs.
///
/// `Debug` is redacted; use [`SecretToken::expose`] at the point the header
/// is built.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretToken(String);

impl SecretToken {
    /// Wraps a token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken(***)")
    }
}

/// Where and how a verdict for one event is reported.
///
/// Both values come from the inbound event: the callback URL is unique to the
/// task result and the access token is only valid for that callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTarget {
    pub url: String,
    pub access_token: SecretToken,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Whole seconds elapsed between this timestamp and now (never negative).
    pub fn seconds_ago(self) -> i64 {
        (Utc::now() - self.0).num_seconds().max(0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
