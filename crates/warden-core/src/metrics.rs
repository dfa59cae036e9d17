//! Metric engine: converts a run history into failure metrics.
//!
//! Pure function of its input. Runs are expected most-recent-first, already
//! bounded to the analysis window by the data source query.

use warden_types::analysis::{RECENT_RUNS_LIMIT, exact_percentage, percentage};
use warden_types::run::{Run, RunConclusion};

/// How non-terminal outcomes (cancelled, skipped, none) affect the
/// consecutive-failure streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreakPolicy {
    /// Pass over them: the streak neither grows nor ends.
    #[default]
    PassThrough,
    /// End the streak at the first such run.
    BreakOnNeutral,
}

/// Failure metrics for one workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowMetrics {
    pub total_runs: u32,
    pub successful_runs: u32,
    /// Failures plus timeouts.
    pub failed_runs: u32,
    pub failure_rate: f64,
    pub consecutive_failures: u32,
    pub last_successful_run: Option<Run>,
    pub recent_runs: Vec<Run>,
}

impl WorkflowMetrics {
    pub fn empty() -> Self {
        compute_metrics(&[], StreakPolicy::default())
    }

    /// Unrounded failure rate. `failure_rate` is rounded for reporting and
    /// must not drive threshold comparisons.
    pub fn exact_failure_rate(&self) -> f64 {
        exact_percentage(u64::from(self.failed_runs), u64::from(self.total_runs))
    }
}

/// Compute metrics over `runs` (most recent first).
pub fn compute_metrics(runs: &[Run], policy: StreakPolicy) -> WorkflowMetrics {
    let total_runs = runs.len() as u32;
    let successful_runs = runs.iter().filter(|r| r.conclusion.is_success()).count() as u32;
    let failed_runs = runs.iter().filter(|r| r.conclusion.is_failure()).count() as u32;

    WorkflowMetrics {
        total_runs,
        successful_runs,
        failed_runs,
        failure_rate: percentage(u64::from(failed_runs), u64::from(total_runs)),
        consecutive_failures: consecutive_failures(runs, policy),
        last_successful_run: runs.iter().find(|r| r.conclusion.is_success()).cloned(),
        recent_runs: runs.iter().take(RECENT_RUNS_LIMIT).cloned().collect(),
    }
}

fn consecutive_failures(runs: &[Run], policy: StreakPolicy) -> u32 {
    let mut streak = 0;
    for run in runs {
        match run.conclusion {
            RunConclusion::Failure | RunConclusion::Timeout => streak += 1,
            RunConclusion::Success => break,
            RunConclusion::Cancelled | RunConclusion::Skipped | RunConclusion::None => {
                if policy == StreakPolicy::BreakOnNeutral {
                    break;
                }
            }
        }
    }
    streak
}
