//! Disable transition: backup, record, and mark every flagged workflow.

use chrono::{DateTime, Utc};
use warden_types::analysis::{AnalysisReport, WorkflowAnalysis};
use warden_types::audit::{AuditAction, AuditLogEntry};
use warden_types::lifecycle::{
    ActionOutcome, DisabledWorkflowRecord, LifecycleAction, LifecycleSummary, Manifest,
    disabled_path_for,
};

use super::{LifecycleError, LifecycleManager};
use crate::repository::remote::RemoteMutator;
use crate::repository::store::{AuditLog, BackupStore, ManifestStore};

impl<M, B, A, R> LifecycleManager<M, B, A, R>
where
    M: ManifestStore,
    B: BackupStore,
    A: AuditLog,
    R: RemoteMutator,
{
    /// Disable every workflow the report flags.
    ///
    /// Workflows already in the manifest, or safelisted since the report was
    /// produced, are skipped. A failed backup or remote call fails only that
    /// workflow. The manifest is written once at the end; if that write
    /// fails, [`LifecycleError::ManifestWrite`] is returned.
    pub async fn disable(
        &self,
        report: &AnalysisReport,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<LifecycleSummary, LifecycleError> {
        let mut working = self.manifest.load().await.map_err(LifecycleError::ManifestLoad)?;
        let mut summary = LifecycleSummary::empty(dry_run);
        let mut pending = 0usize;

        for analysis in report.flagged() {
            let outcome = if working.contains(&analysis.repository, &analysis.workflow_path) {
                ActionOutcome::Skipped {
                    reason: "already disabled".to_string(),
                }
            } else if self.safelist.contains(analysis.file_name()) {
                ActionOutcome::Skipped {
                    reason: "safelisted".to_string(),
                }
            } else if dry_run {
                self.audit
                    .record(disable_entry(analysis).simulated(true))
                    .await;
                ActionOutcome::Simulated
            } else {
                let outcome = self.disable_one(analysis, &mut working, now).await;
                if outcome == ActionOutcome::Completed {
                    pending += 1;
                }
                outcome
            };

            tracing::info!(
                repository = %analysis.repository,
                workflow = %analysis.workflow_path,
                outcome = %outcome,
                dry_run,
                "disable"
            );
            summary.actions.push(LifecycleAction {
                repository: analysis.repository.clone(),
                workflow_name: analysis.workflow_name.clone(),
                workflow_path: analysis.workflow_path.clone(),
                reasons: analysis.disable_reasons.clone(),
                outcome,
            });
        }

        if !dry_run && pending > 0 {
            working.updated_at = now;
            if let Err(source) = self.manifest.save(&working).await {
                self.audit
                    .record(
                        AuditLogEntry::new(AuditAction::Disable)
                            .detail("stage", "manifest_write")
                            .detail("pending", pending)
                            .failed(&source),
                    )
                    .await;
                return Err(LifecycleError::ManifestWrite { pending, source });
            }
            summary.manifest_written = true;
        }

        Ok(summary)
    }

    async fn disable_one(
        &self,
        analysis: &WorkflowAnalysis,
        working: &mut Manifest,
        now: DateTime<Utc>,
    ) -> ActionOutcome {
        let receipt = match self.backups.write(analysis).await {
            Ok(receipt) => {
                self.audit
                    .record(
                        AuditLogEntry::new(AuditAction::Backup)
                            .workflow(&analysis.repository, &analysis.workflow_path)
                            .detail("location", receipt.location.clone())
                            .detail("sha256", receipt.sha256.clone()),
                    )
                    .await;
                receipt
            }
            Err(e) => {
                tracing::error!(
                    repository = %analysis.repository,
                    workflow = %analysis.workflow_path,
                    error = %e,
                    "backup failed, workflow not disabled"
                );
                self.audit
                    .record(
                        AuditLogEntry::new(AuditAction::Backup)
                            .workflow(&analysis.repository, &analysis.workflow_path)
                            .failed(&e),
                    )
                    .await;
                self.audit
                    .record(disable_entry(analysis).failed(format!("backup failed: {e}")))
                    .await;
                return ActionOutcome::Failed {
                    error: format!("backup failed: {e}"),
                };
            }
        };

        let record = DisabledWorkflowRecord {
            repository: analysis.repository.clone(),
            workflow_name: analysis.workflow_name.clone(),
            workflow_id: analysis.workflow_id,
            original_path: analysis.workflow_path.clone(),
            disabled_path: disabled_path_for(&analysis.workflow_path),
            backup_location: receipt.location,
            backup_sha256: receipt.sha256,
            disabled_at: now,
            reasons: analysis.disable_reasons.clone(),
            analysis: analysis.clone(),
        };

        let mutation = match self.remote.disable(&record).await {
            Ok(mutation) => mutation,
            Err(e) => {
                tracing::error!(
                    repository = %analysis.repository,
                    workflow = %analysis.workflow_path,
                    error = %e,
                    "remote disable failed"
                );
                self.audit.record(disable_entry(analysis).failed(&e)).await;
                return ActionOutcome::Failed { error: e.to_string() };
            }
        };

        let entry = disable_entry(analysis)
            .detail("backup_location", record.backup_location.clone())
            .detail("disabled_path", record.disabled_path.clone())
            .detail("remote", mutation.to_string());
        working.insert(record);
        self.audit.record(entry).await;
        ActionOutcome::Completed
    }
}

fn disable_entry(analysis: &WorkflowAnalysis) -> AuditLogEntry {
    AuditLogEntry::new(AuditAction::Disable)
        .workflow(&analysis.repository, &analysis.workflow_path)
        .detail("workflow_name", analysis.workflow_name.clone())
        .detail("reasons", analysis.disable_reasons.clone())
}
