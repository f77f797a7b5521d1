//! In-memory fakes of the port traits for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use runtask::{
    ApplyOutcome, CallbackTarget, ReportError, ResultReporter, RunId, RunService,
    RunServiceError, RunSource, RunState, RunStatus, SecretToken, Verdict, WorkspaceId,
    WorkspacePolicy,
};
use tokio::time::Instant;

pub fn run_id(id: &str) -> RunId {
    RunId::new(id).unwrap()
}

pub fn workspace_id(id: &str) -> WorkspaceId {
    WorkspaceId::new(id).unwrap()
}

pub fn run_state(status: RunStatus, is_confirmable: bool, source: RunSource) -> RunState {
    RunState {
        status,
        is_confirmable,
        source,
        workspace_id: workspace_id("ws-1"),
    }
}

pub fn callback_target() -> CallbackTarget {
    CallbackTarget {
        url: "https://app.terraform.io/api/v2/task-results/tr-1/callback".into(),
        access_token: SecretToken::new("callback-token"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchRun(RunId),
    FetchWorkspace(WorkspaceId),
    ApplyRun(RunId),
}

/// Scripted [`RunService`]. Each run has a sequence of responses; the last
/// one repeats once the sequence is exhausted.
#[derive(Default)]
pub struct FakeRunService {
    runs: Mutex<HashMap<RunId, VecDeque<Result<RunState, RunServiceError>>>>,
    workspaces: Mutex<HashMap<WorkspaceId, Result<WorkspacePolicy, RunServiceError>>>,
    applies: Mutex<HashMap<RunId, VecDeque<Result<ApplyOutcome, RunServiceError>>>>,
    calls: Mutex<Vec<(Call, Instant)>>,
}

fn next_scripted<T: Clone>(script: &mut VecDeque<T>) -> Option<T> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

impl FakeRunService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_run(&self, id: &str, responses: Vec<Result<RunState, RunServiceError>>) {
        self.runs
            .lock()
            .unwrap()
            .insert(run_id(id), responses.into_iter().collect());
    }

    pub fn script_workspace(&self, id: &str, response: Result<WorkspacePolicy, RunServiceError>) {
        self.workspaces
            .lock()
            .unwrap()
            .insert(workspace_id(id), response);
    }

    pub fn script_apply(&self, id: &str, responses: Vec<Result<ApplyOutcome, RunServiceError>>) {
        self.applies
            .lock()
            .unwrap()
            .insert(run_id(id), responses.into_iter().collect());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    pub fn timed_calls(&self) -> Vec<(Call, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn apply_calls(&self, id: &str) -> usize {
        let id = run_id(id);
        self.calls()
            .into_iter()
            .filter(|call| *call == Call::ApplyRun(id.clone()))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }
}

#[async_trait]
impl RunService for FakeRunService {
    async fn fetch_run(&self, id: &RunId) -> Result<RunState, RunServiceError> {
        self.record(Call::FetchRun(id.clone()));
        self.runs
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(next_scripted)
            .unwrap_or_else(|| Err(RunServiceError::from_status(404, "run not scripted")))
    }

    async fn fetch_workspace(&self, id: &WorkspaceId) -> Result<WorkspacePolicy, RunServiceError> {
        self.record(Call::FetchWorkspace(id.clone()));
        self.workspaces
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(RunServiceError::from_status(404, "workspace not scripted")))
    }

    async fn apply_run(&self, id: &RunId) -> Result<ApplyOutcome, RunServiceError> {
        self.record(Call::ApplyRun(id.clone()));
        self.applies
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(next_scripted)
            .unwrap_or(Ok(ApplyOutcome::Accepted))
    }
}

/// [`ResultReporter`] that records every verdict it is asked to deliver.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(CallbackTarget, Verdict)>>,
    fail_with: Option<ReportError>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: ReportError) -> Self {
        Self {
            reports: Mutex::default(),
            fail_with: Some(error),
        }
    }

    pub fn verdicts(&self) -> Vec<Verdict> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(_, verdict)| verdict.clone())
            .collect()
    }

    pub fn targets(&self) -> Vec<CallbackTarget> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(target, _)| target.clone())
            .collect()
    }
}

#[async_trait]
impl ResultReporter for RecordingReporter {
    async fn report(&self, target: &CallbackTarget, verdict: &Verdict) -> Result<(), ReportError> {
        self.reports
            .lock()
            .unwrap()
            .push((target.clone(), verdict.clone()));
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
