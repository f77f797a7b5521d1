//! HCP Terraform / Terraform Enterprise API adapter.
//!
//! Implements the port traits defined in the [`runtask`] crate over the
//! platform's JSON:API endpoints:
//!
//! | Trait method | Endpoint |
//! |--------------|----------|
//! | `RunService::fetch_run` | `GET /api/v2/runs/{run_id}` |
//! | `RunService::fetch_workspace` | `GET /api/v2/workspaces/{workspace_id}` |
//! | `RunService::apply_run` | `POST /api/v2/runs/{run_id}/actions/apply` |
//! | `ResultReporter::report` | `PATCH {task_result_callback_url}` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Status-code
//! interpretation and JSON:API document shapes are handled here; the
//! `autoapply` crate never sees them.

pub mod client;
pub mod models;

pub use client::{TfcClient, TfcClientError, TfcConfig, DEFAULT_APPLY_COMMENT, DEFAULT_BASE_URL};
