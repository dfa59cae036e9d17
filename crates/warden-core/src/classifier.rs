//! Classifier: applies threshold rules and the safelist to computed metrics.
//!
//! Rules are evaluated in order and every matching rule contributes a reason:
//!
//! 1. Safelisted file name -- never disable, short-circuits everything else.
//! 2. `consecutive >= threshold && total >= threshold`.
//! 3. `failure_rate >= rate_threshold && total >= MIN_RUNS_FOR_RATE`.
//! 4. `total > 0 && successful == 0`.

use std::collections::BTreeSet;

use warden_types::config::AuditConfig;

use crate::metrics::WorkflowMetrics;

/// Minimum sample size before the failure-rate rule applies. Independent of
/// configuration.
pub const MIN_RUNS_FOR_RATE: u32 = 5;

/// Thresholds and safelist used to classify a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub failure_threshold: u32,
    pub failure_rate_threshold: f64,
    pub safelist: BTreeSet<String>,
}

impl Thresholds {
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            failure_rate_threshold: config.failure_rate_threshold,
            safelist: config.safelisted_workflows.clone(),
        }
    }
}

/// The disable decision and its explanation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub should_disable: bool,
    pub reasons: Vec<String>,
}

/// Decide whether a workflow should be disabled.
///
/// `file_name` is the last segment of the workflow's definition path.
pub fn classify(file_name: &str, metrics: &WorkflowMetrics, thresholds: &Thresholds) -> Classification {
    if thresholds.safelist.contains(file_name) {
        return Classification::default();
    }

    let mut reasons = Vec::new();

    if metrics.consecutive_failures >= thresholds.failure_threshold
        && metrics.total_runs >= thresholds.failure_threshold
    {
        reasons.push(format!(
            "{} consecutive failures (threshold: {})",
            metrics.consecutive_failures, thresholds.failure_threshold
        ));
    }

    if metrics.exact_failure_rate() >= thresholds.failure_rate_threshold
        && metrics.total_runs >= MIN_RUNS_FOR_RATE
    {
        reasons.push(format!(
            "{}% failure rate (threshold: {}%)",
            metrics.failure_rate, thresholds.failure_rate_threshold
        ));
    }

    if metrics.total_runs > 0 && metrics.successful_runs == 0 {
        reasons.push("No successful runs".to_string());
    }

    Classification {
        should_disable: !reasons.is_empty(),
        reasons,
    }
}
