//! Eligibility rules: should this run be auto-applied?
//!
//! Only runs that were started by another workspace's run (a run trigger) and
//! that belong to a workspace with auto-apply enabled are scheduled. Every
//! other run passes the run task untouched so it never blocks a normal,
//! human-reviewed run.
//!
//! Rules are evaluated in order and the first one that applies decides:
//!
//! 1. no callback target → [`Decision::Skip`]
//! 2. stage is not `post_plan` → passed
//! 3. no run id → failed
//! 4. run cannot be fetched → failed, upstream error in the message
//! 5. run was not started by a run trigger → passed
//! 6. workspace cannot be fetched → failed, upstream error in the message
//! 7. workspace auto-apply disabled → passed
//! 8. otherwise → passed, and the run is scheduled

use std::sync::Arc;

use runtask::{CallbackTarget, RunId, RunService, RunTaskEvent, Verdict};
use tracing::{debug, info, warn};

pub const NOT_POST_PLAN: &str = "Nothing to do: not a post_plan phase";
pub const NO_RUN_ID: &str = "no run_id specified in the payload";
pub const NOT_RUN_TRIGGERED: &str = "Nothing to do: not a run-triggered run";
pub const AUTO_APPLY_DISABLED: &str = "Nothing to do: workspace not configured for auto-apply";

/// Outcome of evaluating one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The event has no callback target: nothing to report, nothing to do.
    Skip,
    /// Report `verdict` to `target`; if `schedule` is set, queue that run.
    Report {
        target: CallbackTarget,
        verdict: Verdict,
        schedule: Option<RunId>,
    },
}

impl Decision {
    fn report(target: CallbackTarget, verdict: Verdict) -> Self {
        Decision::Report {
            target,
            verdict,
            schedule: None,
        }
    }
}

/// Applies the eligibility rules to run task events.
#[derive(Clone)]
pub struct EligibilityEngine {
    service: Arc<dyn RunService>,
}

impl EligibilityEngine {
    pub fn new(service: Arc<dyn RunService>) -> Self {
        Self { service }
    }

    /// Decides what to report for `event` and whether to schedule its run.
    ///
    /// Fetch failures are not retried here; they become failed verdicts.
    pub async fn evaluate(&self, event: &RunTaskEvent) -> Decision {
        let Some(target) = event.callback_target() else {
            warn!("event has no task result callback; nothing to report");
            return Decision::Skip;
        };

        if !event.is_post_plan() {
            debug!(stage = ?event.stage, "event is not for the post_plan stage");
            return Decision::report(target, Verdict::passed(NOT_POST_PLAN));
        }

        let Some(run_id) = event.run_id() else {
            warn!("event has no run_id");
            return Decision::report(target, Verdict::failed(NO_RUN_ID));
        };

        let run = match self.service.fetch_run(&run_id).await {
            Ok(run) => run,
            Err(err) => {
                warn!(run_id = %run_id, error = %err, "failed to get run details");
                return Decision::report(
                    target,
                    Verdict::failed(format!("failed to get run details: {err}")),
                );
            }
        };

        if !run.source.is_run_trigger() {
            info!(run_id = %run_id, source = %run.source, "run was not started by a run trigger");
            return Decision::report(target, Verdict::passed(NOT_RUN_TRIGGERED));
        }

        let policy = match self.service.fetch_workspace(&run.workspace_id).await {
            Ok(policy) => policy,
            Err(err) => {
                warn!(
                    run_id = %run_id,
                    workspace_id = %run.workspace_id,
                    error = %err,
                    "failed to get workspace details"
                );
                return Decision::report(
                    target,
                    Verdict::failed(format!("failed to get workspace details: {err}")),
                );
            }
        };

        if !policy.auto_apply {
            info!(
                run_id = %run_id,
                workspace_id = %run.workspace_id,
                "workspace is not configured for auto-apply"
            );
            return Decision::report(target, Verdict::passed(AUTO_APPLY_DISABLED));
        }

        info!(run_id = %run_id, workspace_id = %run.workspace_id, "run eligible for auto-apply");
        Decision::Report {
            target,
            verdict: Verdict::passed(format!("{run_id} queued for auto-apply")),
            schedule: Some(run_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run_id, run_state, Call, FakeRunService};
    use runtask::{RunServiceError, RunSource, RunStatus, VerdictStatus, WorkspacePolicy};

    mod event {
        use runtask::{RunTaskEvent, SecretToken, Stage};

        pub fn post_plan(run_id: Option<&str>) -> RunTaskEvent {
            RunTaskEvent {
                stage: Some(Stage::PostPlan),
                access_token: Some(SecretToken::new("callback-token")),
                task_result_callback_url: Some(
                    "https://app.terraform.io/api/v2/task-results/tr-1/callback".into(),
                ),
                run_id: run_id.map(str::to_string),
                ..RunTaskEvent::default()
            }
        }
    }

    fn engine(service: &Arc<FakeRunService>) -> EligibilityEngine {
        let service: Arc<dyn RunService> = service.clone();
        EligibilityEngine::new(service)
    }

    fn verdict_of(decision: Decision) -> (Verdict, Option<RunId>) {
        match decision {
            Decision::Report {
                verdict, schedule, ..
            } => (verdict, schedule),
            Decision::Skip => panic!("expected a verdict"),
        }
    }

    fn eligible_service() -> Arc<FakeRunService> {
        let service = Arc::new(FakeRunService::new());
        service.script_run(
            "run-1",
            vec![Ok(run_state(RunStatus::Pending, false, RunSource::RunTrigger))],
        );
        service.script_workspace("ws-1", Ok(WorkspacePolicy { auto_apply: true }));
        service
    }

    #[tokio::test]
    async fn missing_callback_is_skipped() {
        let service = eligible_service();
        let mut event = event::post_plan(Some("run-1"));
        event.task_result_callback_url = None;

        assert_eq!(engine(&service).evaluate(&event).await, Decision::Skip);
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn other_stages_pass_without_scheduling() {
        let service = eligible_service();
        for stage in [
            runtask::Stage::PrePlan,
            runtask::Stage::PreApply,
            runtask::Stage::PostApply,
            runtask::Stage::Unknown,
        ] {
            let mut event = event::post_plan(Some("run-1"));
            event.stage = Some(stage);

            let (verdict, schedule) = verdict_of(engine(&service).evaluate(&event).await);
            assert_eq!(verdict, Verdict::passed(NOT_POST_PLAN));
            assert!(schedule.is_none());
        }
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_run_id_fails() {
        let service = eligible_service();
        let (verdict, schedule) =
            verdict_of(engine(&service).evaluate(&event::post_plan(None)).await);

        assert_eq!(verdict, Verdict::failed(NO_RUN_ID));
        assert!(schedule.is_none());
    }

    #[tokio::test]
    async fn run_fetch_failure_surfaces_upstream_error() {
        let service = Arc::new(FakeRunService::new());
        service.script_run(
            "run-1",
            vec![Err(RunServiceError::from_status(404, "run not found"))],
        );

        let (verdict, schedule) = verdict_of(
            engine(&service)
                .evaluate(&event::post_plan(Some("run-1")))
                .await,
        );

        assert_eq!(verdict.status, VerdictStatus::Failed);
        assert!(verdict.message.starts_with("failed to get run details"));
        assert!(verdict.message.contains("run not found"));
        assert!(schedule.is_none());
    }

    #[tokio::test]
    async fn non_run_trigger_sources_pass() {
        for source in [
            RunSource::Vcs,
            RunSource::Ui,
            RunSource::Other("tfe-api".into()),
        ] {
            let service = Arc::new(FakeRunService::new());
            service.script_run("run-1", vec![Ok(run_state(RunStatus::Pending, false, source))]);

            let (verdict, schedule) = verdict_of(
                engine(&service)
                    .evaluate(&event::post_plan(Some("run-1")))
                    .await,
            );

            assert_eq!(verdict, Verdict::passed(NOT_RUN_TRIGGERED));
            assert!(schedule.is_none());
            assert_eq!(service.calls(), vec![Call::FetchRun(run_id("run-1"))]);
        }
    }

    #[tokio::test]
    async fn workspace_fetch_failure_fails() {
        let service = Arc::new(FakeRunService::new());
        service.script_run(
            "run-1",
            vec![Ok(run_state(RunStatus::Pending, false, RunSource::RunTrigger))],
        );
        service.script_workspace(
            "ws-1",
            Err(RunServiceError::from_status(401, "unauthorized")),
        );

        let (verdict, schedule) = verdict_of(
            engine(&service)
                .evaluate(&event::post_plan(Some("run-1")))
                .await,
        );

        assert_eq!(verdict.status, VerdictStatus::Failed);
        assert!(verdict.message.starts_with("failed to get workspace details"));
        assert!(schedule.is_none());
    }

    #[tokio::test]
    async fn auto_apply_disabled_passes_without_scheduling() {
        let service = Arc::new(FakeRunService::new());
        service.script_run(
            "run-1",
            vec![Ok(run_state(RunStatus::Pending, false, RunSource::RunTrigger))],
        );
        service.script_workspace("ws-1", Ok(WorkspacePolicy { auto_apply: false }));

        let (verdict, schedule) = verdict_of(
            engine(&service)
                .evaluate(&event::post_plan(Some("run-1")))
                .await,
        );

        assert!(verdict.is_passed());
        assert!(verdict.message.contains("not configured for auto-apply"));
        assert!(schedule.is_none());
    }

    #[tokio::test]
    async fn eligible_run_is_scheduled() {
        let service = eligible_service();

        let (verdict, schedule) = verdict_of(
            engine(&service)
                .evaluate(&event::post_plan(Some("run-1")))
                .await,
        );

        assert!(verdict.is_passed());
        assert!(verdict.message.contains("queued for auto-apply"));
        assert_eq!(schedule, Some(run_id("run-1")));
        assert_eq!(
            service.calls(),
            vec![
                Call::FetchRun(run_id("run-1")),
                Call::FetchWorkspace(crate::testing::workspace_id("ws-1")),
            ]
        );
    }
}
