//! Core domain for the run-trigger auto-apply run task.
//!
//! This crate contains every domain concept, newtype identifier, value type,
//! and port trait shared by the rest of the workspace. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed from the orchestration platform; the `tfc`
//! crate defines *how* it is obtained over HTTP.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RunId`, `WorkspaceId`, `EventId`) |
//! | [`types`] | Run state snapshots, workspace policy, verdicts, secrets |
//! | [`event`] | The inbound run task event payload |
//! | [`errors`] | Port error types |
//! | [`ports`] | `RunService` and `ResultReporter` traits |

pub mod errors;
pub mod event;
pub mod identifiers;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{ReportError, RunServiceError};
pub use event::{EnforcementLevel, RunTaskEvent, Stage};
pub use identifiers::{EventId, RunId, TaskResultId, WorkspaceId};
pub use ports::{ResultReporter, RunService};
pub use types::{
    ApplyOutcome, CallbackTarget, RunSource, RunState, RunStatus, SecretToken, Timestamp, Verdict,
    VerdictStatus, WorkspacePolicy,
};
