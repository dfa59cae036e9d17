//! GitHub REST API response types.
//!
//! These mirror only the fields Warden reads. Conversions into the
//! provider-agnostic types from `warden-types` live here too.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use warden_types::run::{QuotaStatus, Run, RunConclusion, RunStatus, WorkflowDescriptor, WorkflowState};

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepository {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubWorkflowList {
    pub total_count: u64,
    pub workflows: Vec<GitHubWorkflow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubWorkflow {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub state: String,
}

impl From<GitHubWorkflow> for WorkflowDescriptor {
    fn from(wf: GitHubWorkflow) -> Self {
        let state = WorkflowState::from_str(&wf.state).unwrap_or(WorkflowState::Unknown);
        WorkflowDescriptor {
            id: wf.id,
            name: wf.name,
            path: wf.path,
            state,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRunList {
    pub total_count: u64,
    pub workflow_runs: Vec<GitHubRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRun {
    pub id: u64,
    pub run_number: u64,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub html_url: Option<String>,
}

impl From<GitHubRun> for Run {
    fn from(run: GitHubRun) -> Self {
        Run {
            id: run.id,
            run_number: run.run_number,
            status: map_status(run.status.as_deref()),
            conclusion: map_conclusion(run.conclusion.as_deref()),
            created_at: run.created_at,
            updated_at: run.updated_at,
            html_url: run.html_url,
        }
    }
}

/// Map a GitHub run `status` onto the three lifecycle states.
pub fn map_status(status: Option<&str>) -> RunStatus {
    match status {
        Some("completed") => RunStatus::Completed,
        Some("queued" | "waiting" | "requested" | "pending") => RunStatus::Pending,
        _ => RunStatus::InProgress,
    }
}

/// Map a GitHub run `conclusion`. `startup_failure` counts as a failure and
/// `timed_out` as a timeout; anything unrecognised is `None`.
pub fn map_conclusion(conclusion: Option<&str>) -> RunConclusion {
    match conclusion {
        Some("success") => RunConclusion::Success,
        Some("failure" | "startup_failure") => RunConclusion::Failure,
        Some("timed_out") => RunConclusion::Timeout,
        Some("cancelled") => RunConclusion::Cancelled,
        Some("skipped") => RunConclusion::Skipped,
        _ => RunConclusion::None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContent {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRateLimit {
    pub resources: GitHubRateResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRateResources {
    pub core: GitHubRate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRate {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds.
    pub reset: i64,
}

impl From<GitHubRate> for QuotaStatus {
    fn from(rate: GitHubRate) -> Self {
        QuotaStatus {
            remaining: rate.remaining,
            limit: rate.limit,
            reset_at: DateTime::from_timestamp(rate.reset, 0).unwrap_or_else(Utc::now),
        }
    }
}
