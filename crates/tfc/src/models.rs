//! JSON:API document shapes exchanged with the platform.
//!
//! Only the attributes the run task reads are modelled; everything else in
//! the platform's documents is ignored on deserialisation.

use runtask::{RunSource, RunState, RunStatus, Verdict, VerdictStatus, WorkspaceId, WorkspacePolicy};
use serde::{Deserialize, Serialize};

/// Top-level JSON:API document.
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RunResource {
    pub attributes: RunAttributes,
    pub relationships: RunRelationships,
}

#[derive(Debug, Deserialize)]
pub struct RunAttributes {
    pub status: RunStatus,
    pub source: RunSource,
    pub actions: RunActions,
}

#[derive(Debug, Deserialize)]
pub struct RunActions {
    #[serde(rename = "is-confirmable")]
    pub is_confirmable: bool,
}

#[derive(Debug, Deserialize)]
pub struct RunRelationships {
    pub workspace: Relationship,
}

#[derive(Debug, Deserialize)]
pub struct Relationship {
    pub data: ResourceIdentifier,
}

#[derive(Debug, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
}

impl RunResource {
    /// Converts the document into the domain snapshot.
    ///
    /// Returns `None` if the workspace relationship carries an empty id.
    pub fn into_run_state(self) -> Option<RunState> {
        Some(RunState {
            status: self.attributes.status,
            is_confirmable: self.attributes.actions.is_confirmable,
            source: self.attributes.source,
            workspace_id: WorkspaceId::new(self.relationships.workspace.data.id)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct WorkspaceResource {
    pub attributes: WorkspaceAttributes,
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceAttributes {
    #[serde(rename = "auto-apply")]
    pub auto_apply: bool,
}

impl From<WorkspaceResource> for WorkspacePolicy {
    fn from(resource: WorkspaceResource) -> Self {
        WorkspacePolicy {
            auto_apply: resource.attributes.auto_apply,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /runs/{id}/actions/apply`.
#[derive(Debug, Serialize)]
pub struct ApplyRequest<'a> {
    pub comment: &'a str,
}

/// Body of the task result callback `PATCH`.
#[derive(Debug, Serialize)]
pub struct TaskResultDocument<'a> {
    pub data: TaskResultData<'a>,
}

#[derive(Debug, Serialize)]
pub struct TaskResultData<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: TaskResultAttributes<'a>,
}

#[derive(Debug, Serialize)]
pub struct TaskResultAttributes<'a> {
    pub status: VerdictStatus,
    pub message: &'a str,
}

impl<'a> From<&'a Verdict> for TaskResultDocument<'a> {
    fn from(verdict: &'a Verdict) -> Self {
        TaskResultDocument {
            data: TaskResultData {
                kind: "task-results",
                attributes: TaskResultAttributes {
                    status: verdict.status,
                    message: &verdict.message,
                },
            },
        }
    }
}
