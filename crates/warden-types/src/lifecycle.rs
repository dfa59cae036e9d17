//! Disable/restore lifecycle types: the manifest of disabled workflows and
//! the summaries returned by lifecycle transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::analysis::WorkflowAnalysis;
use crate::run::file_name_of;

/// Suffix appended to a definition path to form its disabled path.
pub const DISABLED_SUFFIX: &str = ".disabled";

/// Derive the disabled path for a definition path
/// (`.github/workflows/ci.yml` -> `.github/workflows/ci.yml.disabled`).
pub fn disabled_path_for(original_path: &str) -> String {
    format!("{original_path}{DISABLED_SUFFIX}")
}

/// A workflow currently disabled by Warden.
///
/// Created only by a successful disable transition; removed only by a
/// restore transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisabledWorkflowRecord {
    pub repository: String,
    pub workflow_name: String,
    pub workflow_id: u64,
    pub original_path: String,
    pub disabled_path: String,
    pub backup_location: String,
    /// SHA-256 hex digest of the backup payload.
    pub backup_sha256: String,
    pub disabled_at: DateTime<Utc>,
    pub reasons: Vec<String>,
    /// The analysis that triggered the disable, kept for audit purposes.
    pub analysis: WorkflowAnalysis,
}

impl DisabledWorkflowRecord {
    pub fn file_name(&self) -> &str {
        file_name_of(&self.original_path)
    }

    fn is_for(&self, repository: &str, path: &str) -> bool {
        self.repository == repository && self.original_path == path
    }
}

/// The durable set of currently disabled workflows.
///
/// Invariant: a (repository, original_path) pair appears at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub updated_at: DateTime<Utc>,
    pub workflows: Vec<DisabledWorkflowRecord>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            updated_at: Utc::now(),
            workflows: Vec::new(),
        }
    }
}

impl Manifest {
    pub fn contains(&self, repository: &str, path: &str) -> bool {
        self.workflows.iter().any(|r| r.is_for(repository, path))
    }

    /// Insert a record. Returns `false` (and leaves the manifest unchanged)
    /// when the workflow is already present.
    pub fn insert(&mut self, record: DisabledWorkflowRecord) -> bool {
        if self.contains(&record.repository, &record.original_path) {
            return false;
        }
        self.workflows.push(record);
        true
    }

    /// Remove the record for a workflow, returning it if present.
    pub fn remove(&mut self, repository: &str, path: &str) -> Option<DisabledWorkflowRecord> {
        let idx = self
            .workflows
            .iter()
            .position(|r| r.is_for(repository, path))?;
        Some(self.workflows.remove(idx))
    }

    /// Records matching a restore filter, in manifest order.
    pub fn matching(&self, filter: &RestoreFilter) -> Vec<&DisabledWorkflowRecord> {
        self.workflows.iter().filter(|r| filter.matches(r)).collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

/// How the `workflow` restore filter is compared against a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMatch {
    /// Equal to the original path, its file name, or the workflow name.
    #[default]
    Exact,
    /// Substring of the original path.
    Substring,
}

/// Selection of manifest records for a restore transition. All provided
/// filters are intersected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreFilter {
    pub repository: Option<String>,
    pub workflow: Option<String>,
    pub all: bool,
    pub matching: WorkflowMatch,
}

impl RestoreFilter {
    /// A filter with no repository, no workflow, and `all` unset selects
    /// nothing; callers reject it before loading the manifest.
    pub fn is_unbounded(&self) -> bool {
        self.repository.is_none() && self.workflow.is_none() && !self.all
    }

    pub fn matches(&self, record: &DisabledWorkflowRecord) -> bool {
        if self.is_unbounded() {
            return false;
        }
        if let Some(repo) = &self.repository {
            if &record.repository != repo {
                return false;
            }
        }
        if let Some(workflow) = &self.workflow {
            let hit = match self.matching {
                WorkflowMatch::Exact => {
                    record.original_path == *workflow
                        || record.file_name() == workflow
                        || record.workflow_name == *workflow
                }
                WorkflowMatch::Substring => record.original_path.contains(workflow.as_str()),
            };
            if !hit {
                return false;
            }
        }
        true
    }
}

/// What happened to one workflow during a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Dry run: the action was computed but nothing was persisted.
    Simulated,
    /// The transition completed and the manifest was updated.
    Completed,
    /// The workflow was left alone.
    Skipped { reason: String },
    /// The transition failed for this workflow only.
    Failed { error: String },
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Simulated => write!(f, "simulated"),
            ActionOutcome::Completed => write!(f, "completed"),
            ActionOutcome::Skipped { reason } => write!(f, "skipped ({reason})"),
            ActionOutcome::Failed { error } => write!(f, "failed ({error})"),
        }
    }
}

/// Per-workflow entry in a lifecycle summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleAction {
    pub repository: String,
    pub workflow_name: String,
    pub workflow_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

/// Result of a disable or restore transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSummary {
    pub dry_run: bool,
    pub actions: Vec<LifecycleAction>,
    /// Whether the manifest was rewritten.
    pub manifest_written: bool,
}

impl LifecycleSummary {
    pub fn empty(dry_run: bool) -> Self {
        Self {
            dry_run,
            actions: Vec::new(),
            manifest_written: false,
        }
    }

    pub fn count(&self, pred: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(&a.outcome)).count()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Completed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Failed { .. }))
    }
}
