//! The inbound run task event.
//!
//! The platform POSTs this payload to the run task endpoint at each stage the
//! run task is attached to. Every field is optional at parse time: the
//! eligibility rules decide what a missing field means, so parsing never
//! rejects a payload that is merely incomplete. Unknown fields are ignored.

use serde::Deserialize;

use crate::{CallbackTarget, RunId, SecretToken, TaskResultId};

/// Run lifecycle stage the event was emitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PrePlan,
    PostPlan,
    PreApply,
    PostApply,
    #[serde(other)]
    Unknown,
}

/// How the platform enforces the task result.
///
/// [`EnforcementLevel::Test`] is only sent once, when the run task is first
/// registered, to check that the endpoint answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementLevel {
    Test,
    Advisory,
    Mandatory,
    #[serde(other)]
    Unknown,
}

/// A run task event as delivered by the platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunTaskEvent {
    #[serde(default)]
    pub payload_version: Option<u32>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub access_token: Option<SecretToken>,
    #[serde(default)]
    pub task_result_id: Option<String>,
    #[serde(default)]
    pub task_result_enforcement_level: Option<EnforcementLevel>,
    #[serde(default)]
    pub task_result_callback_url: Option<String>,
    #[serde(default)]
    pub run_app_url: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub run_message: Option<String>,
    #[serde(default)]
    pub run_created_by: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub workspace_name: Option<String>,
    #[serde(default)]
    pub organization_name: Option<String>,
}

impl RunTaskEvent {
    /// Parses an event from the raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Returns `true` for the registration probe, which must be acknowledged
    /// without any processing.
    pub fn is_test_probe(&self) -> bool {
        self.task_result_enforcement_level == Some(EnforcementLevel::Test)
    }

    /// Returns `true` if the event was emitted after the plan completed.
    pub fn is_post_plan(&self) -> bool {
        self.stage == Some(Stage::PostPlan)
    }

    /// The run this event refers to, if the payload names one.
    pub fn run_id(&self) -> Option<RunId> {
        self.run_id.as_deref().and_then(RunId::new)
    }

    /// The task result named in the payload, if any.
    pub fn task_result_id(&self) -> Option<TaskResultId> {
        self.task_result_id.as_deref().and_then(TaskResultId::new)
    }

    /// Where the verdict for this event must be reported.
    ///
    /// `None` when the payload lacks a callback URL or the token needed to
    /// authenticate against it; such an event has nothing to report to.
    pub fn callback_target(&self) -> Option<CallbackTarget> {
        let url = self
            .task_result_callback_url
            .as_deref()
            .filter(|u| !u.is_empty())?;
        let access_token = self.access_token.clone().filter(|t| !t.is_empty())?;
        Some(CallbackTarget {
            url: url.to_string(),
            access_token,
        })
    }
}
