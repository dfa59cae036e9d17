//! Data-source facing types: runs, workflow descriptors, and quota status.
//!
//! These are produced by a data source and treated as immutable by the rest
//! of the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::InProgress => write!(f, "in_progress"),
            RunStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Terminal outcome of a run. `None` while the run has not finished, or when
/// the provider reports an outcome with no mapping here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Failure,
    Timeout,
    Cancelled,
    Skipped,
    None,
}

impl RunConclusion {
    /// Failures and timeouts both count against a workflow.
    pub fn is_failure(self) -> bool {
        matches!(self, RunConclusion::Failure | RunConclusion::Timeout)
    }

    pub fn is_success(self) -> bool {
        self == RunConclusion::Success
    }
}

impl fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunConclusion::Success => write!(f, "success"),
            RunConclusion::Failure => write!(f, "failure"),
            RunConclusion::Timeout => write!(f, "timeout"),
            RunConclusion::Cancelled => write!(f, "cancelled"),
            RunConclusion::Skipped => write!(f, "skipped"),
            RunConclusion::None => write!(f, "none"),
        }
    }
}

/// One execution of a workflow.
///
/// Data sources deliver runs ordered by `created_at`, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    /// Per-workflow sequence number.
    pub run_number: u64,
    pub status: RunStatus,
    pub conclusion: RunConclusion,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Browser link to the run, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Enabled/disabled state of a workflow as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Active,
    Disabled,
    Unknown,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Active => write!(f, "active"),
            WorkflowState::Disabled => write!(f, "disabled"),
            WorkflowState::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for WorkflowState {
    type Err = String;

    /// Accepts the provider's state strings (`active`, `disabled_manually`,
    /// `disabled_inactivity`, ...). Unrecognised values map to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if lower == "active" {
            Ok(WorkflowState::Active)
        } else if lower.starts_with("disabled") {
            Ok(WorkflowState::Disabled)
        } else {
            Ok(WorkflowState::Unknown)
        }
    }
}

/// A workflow definition as enumerated by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDescriptor {
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Definition path inside the repository, e.g. `.github/workflows/ci.yml`.
    pub path: String,
    pub state: WorkflowState,
}

impl WorkflowDescriptor {
    /// The definition's file name (last path segment).
    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

/// Last segment of a slash-separated definition path.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Remaining request quota reported by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conclusion_classification() {
        assert!(RunConclusion::Failure.is_failure());
        assert!(RunConclusion::Timeout.is_failure());
        assert!(!RunConclusion::Cancelled.is_failure());
        assert!(!RunConclusion::Skipped.is_failure());
        assert!(!RunConclusion::None.is_failure());
        assert!(RunConclusion::Success.is_success());
        assert!(!RunConclusion::Timeout.is_success());
    }

    #[test]
    fn test_workflow_state_from_provider_strings() {
        assert_eq!("active".parse::<WorkflowState>(), Ok(WorkflowState::Active));
        assert_eq!(
            "disabled_manually".parse::<WorkflowState>(),
            Ok(WorkflowState::Disabled)
        );
        assert_eq!(
            "disabled_inactivity".parse::<WorkflowState>(),
            Ok(WorkflowState::Disabled)
        );
        assert_eq!("deleted".parse::<WorkflowState>(), Ok(WorkflowState::Unknown));
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of(".github/workflows/ci.yml"), "ci.yml");
        assert_eq!(file_name_of("ci.yml"), "ci.yml");
    }

    #[test]
    fn test_run_serde_uses_snake_case() {
        let run = Run {
            id: 1,
            run_number: 7,
            status: RunStatus::InProgress,
            conclusion: RunConclusion::None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            html_url: None,
        };
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["conclusion"], "none");
        assert!(json.get("html_url").is_none());
    }
}
