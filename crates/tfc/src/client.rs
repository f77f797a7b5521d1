//! HTTP client for the platform API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, StatusCode};
use runtask::{
    ApplyOutcome, CallbackTarget, ReportError, ResultReporter, RunId, RunService, RunServiceError,
    RunState, SecretToken, Verdict, WorkspaceId, WorkspacePolicy,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::models::{ApplyRequest, Document, RunResource, TaskResultDocument, WorkspaceResource};

/// HCP Terraform. Terraform Enterprise installations use their own hostname.
pub const DEFAULT_BASE_URL: &str = "https://app.terraform.io";

/// Comment attached to every apply this service performs.
pub const DEFAULT_APPLY_COMMENT: &str = "Automatically applying run triggered run";

const JSON_API: &str = "application/vnd.api+json";

/// Connection settings for [`TfcClient`].
#[derive(Debug, Clone)]
pub struct TfcConfig {
    /// Scheme and host of the platform, without the `/api/v2` suffix.
    pub base_url: String,
    /// Team or user token with permission to read runs/workspaces and apply runs.
    pub api_token: SecretToken,
    pub apply_comment: String,
    /// Per-request timeout covering connect, send, and body download.
    pub request_timeout: Duration,
}

impl TfcConfig {
    /// Settings for HCP Terraform with the default comment and timeout.
    pub fn new(api_token: SecretToken) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token,
            apply_comment: DEFAULT_APPLY_COMMENT.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct TfcClientError(#[from] reqwest::Error);

/// Platform API client implementing [`RunService`] and [`ResultReporter`].
#[derive(Debug, Clone)]
pub struct TfcClient {
    http: reqwest::Client,
    base_url: String,
    api_token: SecretToken,
    apply_comment: String,
}

impl TfcClient {
    pub fn new(config: TfcConfig) -> Result<Self, TfcClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("tfc-autoapply/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token,
            apply_comment: config.apply_comment,
        })
    }

    fn api_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api/v2/{}", self.base_url, path))
            .bearer_auth(self.api_token.expose())
            .header(header::CONTENT_TYPE, JSON_API)
    }

    async fn get_document<T: DeserializeOwned>(&self, path: &str) -> Result<T, RunServiceError> {
        let response = self
            .api_request(Method::GET, path)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if status != StatusCode::OK {
            return Err(RunServiceError::from_status(status.as_u16(), body));
        }

        let document: Document<T> =
            serde_json::from_str(&body).map_err(|err| RunServiceError::Decode {
                message: err.to_string(),
            })?;
        Ok(document.data)
    }
}

/// Reads the body of a non-success response for inclusion in an error.
///
/// A failed read is logged and yields an empty body; the status code alone
/// still identifies the failure.
async fn error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, "failed to read error response body");
            String::new()
        }
    }
}

fn transport_error(err: reqwest::Error) -> RunServiceError {
    RunServiceError::Transport {
        message: err.to_string(),
    }
}

#[async_trait]
impl RunService for TfcClient {
    #[instrument(skip_all, fields(run_id = %run_id))]
    async fn fetch_run(&self, run_id: &RunId) -> Result<RunState, RunServiceError> {
        let run: RunResource = self.get_document(&format!("runs/{run_id}")).await?;
        let state = run.into_run_state().ok_or_else(|| RunServiceError::Decode {
            message: "run has no workspace relationship id".to_string(),
        })?;
        debug!(status = ?state.status, is_confirmable = state.is_confirmable, "fetched run");
        Ok(state)
    }

    #[instrument(skip_all, fields(workspace_id = %workspace_id))]
    async fn fetch_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<WorkspacePolicy, RunServiceError> {
        let workspace: WorkspaceResource = self
            .get_document(&format!("workspaces/{workspace_id}"))
            .await?;
        Ok(workspace.into())
    }

    #[instrument(skip_all, fields(run_id = %run_id))]
    async fn apply_run(&self, run_id: &RunId) -> Result<ApplyOutcome, RunServiceError> {
        let response = self
            .api_request(Method::POST, &format!("runs/{run_id}/actions/apply"))
            .json(&ApplyRequest {
                comment: &self.apply_comment,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let outcome = match response.status() {
            StatusCode::ACCEPTED => ApplyOutcome::Accepted,
            StatusCode::CONFLICT => ApplyOutcome::Conflict,
            status => ApplyOutcome::Rejected {
                status: status.as_u16(),
                body: error_body(response).await,
            },
        };
        debug!(?outcome, "apply requested");
        Ok(outcome)
    }
}

#[async_trait]
impl ResultReporter for TfcClient {
    #[instrument(skip_all, fields(status = %verdict.status))]
    async fn report(&self, target: &CallbackTarget, verdict: &Verdict) -> Result<(), ReportError> {
        let body = serde_json::to_vec(&TaskResultDocument::from(verdict)).map_err(|err| {
            ReportError::Encode {
                message: err.to_string(),
            }
        })?;

        let response = self
            .http
            .patch(&target.url)
            .bearer_auth(target.access_token.expose())
            .header(header::CONTENT_TYPE, JSON_API)
            .body(body)
            .send()
            .await
            .map_err(|err| ReportError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(ReportError::Rejected {
            status: status.as_u16(),
            body: error_body(response).await,
        })
    }
}
