//! Audit recorder: appends entries without letting audit failures abort the
//! operation being audited.

use warden_types::audit::AuditLogEntry;

use crate::repository::store::AuditLog;

/// Thin wrapper over an [`AuditLog`] used by the lifecycle manager and the
/// CLI.
///
/// Each entry is appended immediately, so entries written before a later
/// failure survive it. A failed append is logged at `error` level and
/// reported back as `false`.
pub struct AuditRecorder<A: AuditLog> {
    log: A,
}

impl<A: AuditLog> AuditRecorder<A> {
    pub fn new(log: A) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &A {
        &self.log
    }

    pub async fn record(&self, entry: AuditLogEntry) -> bool {
        match self.log.append(&entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    action = %entry.action,
                    repository = entry.repository.as_deref().unwrap_or("-"),
                    workflow = entry.workflow.as_deref().unwrap_or("-"),
                    error = %e,
                    "failed to append audit entry"
                );
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MemoryAuditLog;
    use super::*;
    use warden_types::audit::AuditAction;

    #[tokio::test]
    async fn test_record_appends() {
        let recorder = AuditRecorder::new(MemoryAuditLog::default());
        assert!(recorder.record(AuditLogEntry::new(AuditAction::Analyze)).await);
        assert_eq!(recorder.log().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_record_swallows_append_failure() {
        let recorder = AuditRecorder::new(MemoryAuditLog::rejecting());
        assert!(!recorder.record(AuditLogEntry::new(AuditAction::Disable)).await);
    }

    #[tokio::test]
    async fn test_recent_returns_tail() {
        let log = MemoryAuditLog::default();
        for action in [AuditAction::Analyze, AuditAction::Backup, AuditAction::Disable] {
            log.append(&AuditLogEntry::new(action)).await.unwrap();
        }
        let tail = log.recent(2).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].action, AuditAction::Backup);
        assert_eq!(tail[1].action, AuditAction::Disable);
    }
}
