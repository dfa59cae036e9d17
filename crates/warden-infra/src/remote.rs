//! Remote mutator that records intent without touching the provider.

use warden_core::repository::remote::{RemoteMutation, RemoteMutator};
use warden_types::error::RemoteError;
use warden_types::lifecycle::DisabledWorkflowRecord;

/// Answers every request with [`RemoteMutation::Deferred`].
///
/// The manifest and backups still record the transition; the workflow's
/// state on the CI provider is left for an external process to change.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredRemoteMutator;

impl DeferredRemoteMutator {
    pub fn new() -> Self {
        Self
    }
}

impl RemoteMutator for DeferredRemoteMutator {
    async fn disable(&self, record: &DisabledWorkflowRecord) -> Result<RemoteMutation, RemoteError> {
        tracing::info!(
            repository = %record.repository,
            workflow = %record.original_path,
            disabled_path = %record.disabled_path,
            "remote disable deferred"
        );
        Ok(RemoteMutation::Deferred)
    }

    async fn restore(&self, record: &DisabledWorkflowRecord) -> Result<RemoteMutation, RemoteError> {
        tracing::info!(
            repository = %record.repository,
            workflow = %record.original_path,
            "remote restore deferred"
        );
        Ok(RemoteMutation::Deferred)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use warden_types::analysis::WorkflowAnalysis;
    use warden_types::lifecycle::disabled_path_for;
    use warden_types::run::WorkflowState;

    use super::*;

    #[tokio::test]
    async fn test_both_directions_are_deferred() {
        let path = ".github/workflows/ci.yml";
        let record = DisabledWorkflowRecord {
            repository: "api".to_string(),
            workflow_name: "CI".to_string(),
            workflow_id: 1,
            original_path: path.to_string(),
            disabled_path: disabled_path_for(path),
            backup_location: String::new(),
            backup_sha256: String::new(),
            disabled_at: Utc::now(),
            reasons: Vec::new(),
            analysis: WorkflowAnalysis {
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
                should_disable: true,
                disable_reasons: Vec::new(),
                issues: Vec::new(),
                fetch_error: None,
            },
        };

        let remote = DeferredRemoteMutator::new();
        assert_eq!(remote.disable(&record).await.unwrap(), RemoteMutation::Deferred);
        assert_eq!(remote.restore(&record).await.unwrap(), RemoteMutation::Deferred);
    }
}
