//! Analysis snapshots produced by one pass over an organization.
//!
//! A pass produces one [`AnalysisReport`] holding a [`RepositoryAnalysis`]
//! per repository and a [`WorkflowAnalysis`] per workflow. Snapshots are
//! never mutated after construction; a new pass builds new ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run::{Run, WorkflowState, file_name_of};

/// Maximum number of recent runs kept on a [`WorkflowAnalysis`].
pub const RECENT_RUNS_LIMIT: usize = 10;

/// Failure metrics and disable decision for one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAnalysis {
    pub repository: String,
    pub workflow_id: u64,
    pub workflow_name: String,
    pub workflow_path: String,
    /// State reported by the data source at analysis time.
    pub remote_state: WorkflowState,
    pub total_runs: u32,
    pub successful_runs: u32,
    pub failed_runs: u32,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    pub failure_rate: f64,
    pub consecutive_failures: u32,
    pub last_successful_run: Option<Run>,
    /// Up to [`RECENT_RUNS_LIMIT`] runs, most recent first.
    pub recent_runs: Vec<Run>,
    pub should_disable: bool,
    /// Non-empty whenever `should_disable` is true.
    pub disable_reasons: Vec<String>,
    /// Advisory findings; these never influence `should_disable`.
    #[serde(default)]
    pub issues: Vec<String>,
    /// Set when run history could not be fetched and the metrics are empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

impl WorkflowAnalysis {
    pub fn file_name(&self) -> &str {
        file_name_of(&self.workflow_path)
    }
}

/// All workflow analyses for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryAnalysis {
    pub repository: String,
    pub total_workflows: u32,
    pub workflows_to_disable: u32,
    pub workflows: Vec<WorkflowAnalysis>,
}

impl RepositoryAnalysis {
    /// Build a repository snapshot, deriving the counts from `workflows`.
    pub fn new(repository: String, workflows: Vec<WorkflowAnalysis>) -> Self {
        let workflows_to_disable = workflows.iter().filter(|w| w.should_disable).count() as u32;
        Self {
            repository,
            total_workflows: workflows.len() as u32,
            workflows_to_disable,
            workflows,
        }
    }
}

/// A repository that was enumerated but never examined because its
/// workflows could not be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRepository {
    pub repository: String,
    pub error: String,
}

/// The result of one analysis pass. The only artifact the lifecycle
/// manager acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub organization: String,
    pub time_window_days: u32,
    /// Repositories returned by the data source after exclusions, including
    /// those skipped for having no workflows.
    pub repositories_scanned: u32,
    /// Repositories present in `repositories`.
    pub total_repositories: u32,
    pub total_workflows: u32,
    pub workflows_to_disable: u32,
    /// Successful runs over all runs examined, rounded to two decimals.
    pub success_rate: f64,
    pub total_runs: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub repositories: Vec<RepositoryAnalysis>,
    /// Repositories whose workflow listing failed, in data-source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_repositories: Vec<SkippedRepository>,
}

impl AnalysisReport {
    /// Iterate over every workflow flagged for disabling, in report order.
    pub fn flagged(&self) -> impl Iterator<Item = &WorkflowAnalysis> {
        self.repositories
            .iter()
            .flat_map(|r| r.workflows.iter())
            .filter(|w| w.should_disable)
    }
}

/// `part / whole * 100` rounded to two decimals; 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> f64 {
    round2(exact_percentage(part, whole))
}

/// `part / whole * 100` without rounding; 0 when `whole` is 0.
pub fn exact_percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(path: &str, flagged: bool) -> WorkflowAnalysis {
        WorkflowAnalysis {
            repository: "api".to_string(),
            workflow_id: 1,
            workflow_name: "CI".to_string(),
            workflow_path: path.to_string(),
            remote_state: WorkflowState::Active,
            total_runs: 0,
            successful_runs: 0,
            failed_runs: 0,
            failure_rate: 0.0,
            consecutive_failures: 0,
            last_successful_run: None,
            recent_runs: Vec::new(),
            should_disable: flagged,
            disable_reasons: Vec::new(),
            issues: Vec::new(),
            fetch_error: None,
        }
    }

    #[test]
    fn test_percentage_handles_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 5), 60.0);
        assert_eq!(percentage(2, 3), 66.67);
        assert!(exact_percentage(2, 3) < 66.67);
        assert_eq!(exact_percentage(0, 0), 0.0);
    }

    #[test]
    fn test_repository_analysis_counts() {
        let repo = RepositoryAnalysis::new(
            "api".to_string(),
            vec![
                analysis(".github/workflows/a.yml", true),
                analysis(".github/workflows/b.yml", false),
                analysis(".github/workflows/c.yml", true),
            ],
        );
        assert_eq!(repo.total_workflows, 3);
        assert_eq!(repo.workflows_to_disable, 2);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(analysis(".github/workflows/deploy.yml", false).file_name(), "deploy.yml");
    }
}
