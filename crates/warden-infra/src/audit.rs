//! Append-only JSON-lines audit log.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use warden_core::repository::store::AuditLog;
use warden_types::audit::AuditLogEntry;
use warden_types::error::StoreError;

use crate::filesystem::io_error;

/// One JSON object per line in `audit.log`. Entries are never rewritten.
///
/// Appends from the same process are serialized; each append is synced to
/// disk before it returns.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for JsonlAuditLog {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(entry).map_err(|e| StoreError::Serialize {
            what: "audit entry".to_string(),
            message: e.to_string(),
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error(parent))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_error(&self.path))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(io_error(&self.path))?;
        file.sync_data().await.map_err(io_error(&self.path))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.path)(e)),
        };

        let mut entries = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditLogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    error = %e,
                    "skipping unreadable audit entry"
                ),
            }
        }

        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;
    use warden_types::audit::AuditAction;

    use super::*;

    fn log_in(tmp: &TempDir) -> JsonlAuditLog {
        JsonlAuditLog::new(tmp.path().join("audit.log"))
    }

    #[tokio::test]
    async fn test_missing_log_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(log_in(&tmp).recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_is_one_line_per_entry() {
        let tmp = TempDir::new().unwrap();
        let log = log_in(&tmp);

        log.append(&AuditLogEntry::new(AuditAction::Analyze).detail("workflows", 12))
            .await
            .unwrap();
        log.append(
            &AuditLogEntry::new(AuditAction::Disable)
                .workflow("api", ".github/workflows/ci.yml")
                .failed("boom"),
        )
        .await
        .unwrap();

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert_eq!(text.lines().count(), 2);

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries[0].action, AuditAction::Analyze);
        assert_eq!(entries[0].details["workflows"], 12);
        assert_eq!(entries[1].repository.as_deref(), Some("api"));
        assert!(!entries[1].success);
    }

    #[tokio::test]
    async fn test_recent_returns_the_tail_in_order() {
        let tmp = TempDir::new().unwrap();
        let log = log_in(&tmp);
        for i in 0..5 {
            log.append(&AuditLogEntry::new(AuditAction::Analyze).detail("seq", i))
                .await
                .unwrap();
        }

        let tail = log.recent(2).await.unwrap();
        let seqs: Vec<i64> = tail
            .iter()
            .map(|e| e.details["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_unreadable_lines_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let log = log_in(&tmp);
        log.append(&AuditLogEntry::new(AuditAction::Restore)).await.unwrap();
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(log.path())
            .await
            .unwrap();
        file.write_all(b"{truncated\n").await.unwrap();
        drop(file);
        log.append(&AuditLogEntry::new(AuditAction::Analyze)).await.unwrap();

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_interleave() {
        let tmp = TempDir::new().unwrap();
        let log = Arc::new(log_in(&tmp));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    log.append(&AuditLogEntry::new(AuditAction::Analyze).detail("seq", i))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(log.recent(100).await.unwrap().len(), 20);
    }
}
