//! Restore transition: remove selected records from the manifest.

use chrono::{DateTime, Utc};
use warden_types::audit::{AuditAction, AuditLogEntry};
use warden_types::lifecycle::{
    ActionOutcome, DisabledWorkflowRecord, LifecycleAction, LifecycleSummary, RestoreFilter,
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
    /// Restore every manifest record matching `filter`.
    ///
    /// An empty candidate set is a no-op. Every processed candidate leaves
    /// the manifest, whether its remote restore succeeded or not; failures
    /// are reported in the summary and the audit log.
    pub async fn restore(
        &self,
        filter: &RestoreFilter,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<LifecycleSummary, LifecycleError> {
        if filter.is_unbounded() {
            return Err(LifecycleError::MissingRestoreFilter);
        }

        let mut working = self.manifest.load().await.map_err(LifecycleError::ManifestLoad)?;
        let candidates: Vec<DisabledWorkflowRecord> =
            working.matching(filter).into_iter().cloned().collect();
        let mut summary = LifecycleSummary::empty(dry_run);

        if candidates.is_empty() {
            tracing::info!(
                repository = filter.repository.as_deref().unwrap_or("*"),
                workflow = filter.workflow.as_deref().unwrap_or("*"),
                "no disabled workflows match, nothing to restore"
            );
            return Ok(summary);
        }

        for record in &candidates {
            let outcome = if dry_run {
                self.audit.record(restore_entry(record).simulated(true)).await;
                ActionOutcome::Simulated
            } else {
                let outcome = self.restore_one(record).await;
                working.remove(&record.repository, &record.original_path);
                outcome
            };

            tracing::info!(
                repository = %record.repository,
                workflow = %record.original_path,
                outcome = %outcome,
                dry_run,
                "restore"
            );
            summary.actions.push(LifecycleAction {
                repository: record.repository.clone(),
                workflow_name: record.workflow_name.clone(),
                workflow_path: record.original_path.clone(),
                reasons: Vec::new(),
                outcome,
            });
        }

        if !dry_run {
            working.updated_at = now;
            if let Err(source) = self.manifest.save(&working).await {
                let pending = candidates.len();
                self.audit
                    .record(
                        AuditLogEntry::new(AuditAction::Restore)
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

    async fn restore_one(&self, record: &DisabledWorkflowRecord) -> ActionOutcome {
        let backup_verified = match self
            .backups
            .verify(&record.backup_location, &record.backup_sha256)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(
                    repository = %record.repository,
                    workflow = %record.original_path,
                    backup = %record.backup_location,
                    "backup digest mismatch or backup missing"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    repository = %record.repository,
                    workflow = %record.original_path,
                    error = %e,
                    "failed to verify backup"
                );
                false
            }
        };

        let entry = restore_entry(record).detail("backup_verified", backup_verified);
        match self.remote.restore(record).await {
            Ok(mutation) => {
                self.audit
                    .record(entry.detail("remote", mutation.to_string()))
                    .await;
                ActionOutcome::Completed
            }
            Err(e) => {
                tracing::error!(
                    repository = %record.repository,
                    workflow = %record.original_path,
                    error = %e,
                    "remote restore failed"
                );
                self.audit.record(entry.failed(&e)).await;
                ActionOutcome::Failed { error: e.to_string() }
            }
        }
    }
}

fn restore_entry(record: &DisabledWorkflowRecord) -> AuditLogEntry {
    AuditLogEntry::new(AuditAction::Restore)
        .workflow(&record.repository, &record.original_path)
        .detail("workflow_name", record.workflow_name.clone())
        .detail("backup_location", record.backup_location.clone())
}

#[cfg(test)]
mod tests {
    use warden_types::audit::AuditAction;
    use warden_types::lifecycle::{ActionOutcome, WorkflowMatch};

    use super::super::test_support::*;
    use super::*;

    async fn seeded() -> TestManager {
        let manager = manager();
        let report = report(vec![
            analysis("api", "ci.yml", true),
            analysis("api", "deploy.yml", true),
            analysis("web", "ci.yml", true),
        ]);
        manager.disable(&report, false, now()).await.unwrap();
        manager
    }

    fn filter(repo: Option<&str>, workflow: Option<&str>) -> RestoreFilter {
        RestoreFilter {
            repository: repo.map(str::to_string),
            workflow: workflow.map(str::to_string),
            ..Default::default()
        }
    }

    fn remaining(manager: &TestManager) -> Vec<(String, String)> {
        manager
            .manifest_store()
            .current()
            .workflows
            .into_iter()
            .map(|r| {
                let file = r.file_name().to_string();
                (r.repository, file)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_unbounded_filter_is_rejected() {
        let manager = seeded().await;
        let err = manager
            .restore(&RestoreFilter::default(), false, now())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::MissingRestoreFilter));
        assert_eq!(remaining(&manager).len(), 3);
    }

    #[tokio::test]
    async fn test_repo_filter_leaves_other_repos_untouched() {
        let manager = seeded().await;

        let summary = manager.restore(&filter(Some("api"), None), false, now()).await.unwrap();

        assert_eq!(summary.completed(), 2);
        assert_eq!(remaining(&manager), vec![("web".to_string(), "ci.yml".to_string())]);
    }

    #[tokio::test]
    async fn test_filters_intersect() {
        let manager = seeded().await;

        manager
            .restore(&filter(Some("web"), Some("ci.yml")), false, now())
            .await
            .unwrap();

        assert_eq!(
            remaining(&manager),
            vec![
                ("api".to_string(), "ci.yml".to_string()),
                ("api".to_string(), "deploy.yml".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_exact_match_does_not_hit_fragments() {
        let manager = seeded().await;

        let summary = manager.restore(&filter(None, Some("ci")), false, now()).await.unwrap();

        // "ci" is the workflow name of both ci.yml records.
        assert_eq!(summary.actions.len(), 2);

        let summary = manager.restore(&filter(None, Some("deploy.y")), false, now()).await.unwrap();
        assert!(summary.actions.is_empty());
        assert_eq!(remaining(&manager).len(), 1);
    }

    #[tokio::test]
    async fn test_substring_match_is_opt_in() {
        let manager = seeded().await;
        let mut f = filter(None, Some("deploy.y"));
        f.matching = WorkflowMatch::Substring;

        let summary = manager.restore(&f, false, now()).await.unwrap();

        assert_eq!(summary.actions.len(), 1);
        assert_eq!(summary.actions[0].workflow_path, ".github/workflows/deploy.yml");
    }

    #[tokio::test]
    async fn test_no_candidates_is_a_no_op() {
        let manager = seeded().await;
        let saves = manager.manifest_store().save_count();

        let summary = manager
            .restore(&filter(Some("missing"), None), false, now())
            .await
            .unwrap();

        assert!(summary.actions.is_empty());
        assert!(!summary.manifest_written);
        assert_eq!(manager.manifest_store().save_count(), saves);
    }

    #[tokio::test]
    async fn test_dry_run_restore_persists_nothing() {
        let manager = seeded().await;
        let before = manager.manifest_store().current();
        let saves = manager.manifest_store().save_count();
        let mut all = RestoreFilter::default();
        all.all = true;

        let summary = manager.restore(&all, true, now()).await.unwrap();

        assert_eq!(summary.count(|o| *o == ActionOutcome::Simulated), 3);
        assert_eq!(manager.manifest_store().current(), before);
        assert_eq!(manager.manifest_store().save_count(), saves);
        assert!(manager.remote.restored.lock().unwrap().is_empty());
        let restore_entries: Vec<_> = manager
            .audit()
            .log()
            .snapshot()
            .into_iter()
            .filter(|e| e.action == AuditAction::Restore)
            .collect();
        assert_eq!(restore_entries.len(), 3);
        assert!(restore_entries.iter().all(|e| e.dry_run));
    }

    #[tokio::test]
    async fn test_failed_restore_is_still_removed() {
        let mut manager = seeded().await;
        manager.remote.reject = Some(".github/workflows/deploy.yml".to_string());

        let summary = manager.restore(&filter(Some("api"), None), false, now()).await.unwrap();

        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(remaining(&manager), vec![("web".to_string(), "ci.yml".to_string())]);
        let failed = manager
            .audit()
            .log()
            .snapshot()
            .into_iter()
            .find(|e| e.action == AuditAction::Restore && !e.success)
            .unwrap();
        assert!(failed.error.unwrap().contains("403"));
    }

    #[tokio::test]
    async fn test_backup_verification_is_recorded() {
        let mut manager = seeded().await;
        manager.backups.tampered = true;

        manager.restore(&filter(Some("web"), None), false, now()).await.unwrap();

        let entry = manager
            .audit()
            .log()
            .snapshot()
            .into_iter()
            .find(|e| e.action == AuditAction::Restore)
            .unwrap();
        assert!(entry.success);
        assert_eq!(entry.details["backup_verified"], false);
    }

    #[tokio::test]
    async fn test_verified_backup_on_clean_restore() {
        let manager = seeded().await;
        manager.restore(&filter(Some("web"), None), false, now()).await.unwrap();
        let entry = manager
            .audit()
            .log()
            .snapshot()
            .into_iter()
            .find(|e| e.action == AuditAction::Restore)
            .unwrap();
        assert_eq!(entry.details["backup_verified"], true);
        assert_eq!(entry.details["remote"], "deferred");
    }
}
