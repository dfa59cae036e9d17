//! Pre-disable workflow backups with SHA-256 receipts.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use warden_core::repository::store::{BackupReceipt, BackupStore};
use warden_types::analysis::WorkflowAnalysis;
use warden_types::error::StoreError;

use super::{atomic_write, io_error, to_pretty_json};

/// Writes each backup to `<dir>/<repo>/<file>-<timestamp>-<id>.json`.
///
/// `<id>` is a UUID v7, so two workflows backed up in the same millisecond
/// never share a path even when their file names differ only by extension.
///
/// The receipt location is the absolute-or-configured path of the file, so
/// a later restore can verify it without knowing the directory layout.
#[derive(Debug, Clone)]
pub struct FileBackupStore {
    dir: PathBuf,
}

impl FileBackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn backup_path(&self, analysis: &WorkflowAnalysis) -> PathBuf {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        let id = Uuid::now_v7().simple();
        self.dir
            .join(path_component(&analysis.repository))
            .join(format!(
                "{}-{timestamp}-{id}.json",
                path_component(analysis.file_name())
            ))
    }
}

fn path_component(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl BackupStore for FileBackupStore {
    async fn write(&self, analysis: &WorkflowAnalysis) -> Result<BackupReceipt, StoreError> {
        let bytes = to_pretty_json(analysis, "workflow backup")?;
        let path = self.backup_path(analysis);
        atomic_write(&path, &bytes).await?;

        let receipt = BackupReceipt {
            location: path.display().to_string(),
            sha256: sha256_hex(&bytes),
        };
        tracing::debug!(
            repository = %analysis.repository,
            workflow = %analysis.workflow_path,
            location = %receipt.location,
            "backup written"
        );
        Ok(receipt)
    }

    async fn verify(&self, location: &str, sha256: &str) -> Result<bool, StoreError> {
        let path = Path::new(location);
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(io_error(path)(e)),
        };
        Ok(sha256_hex(&bytes).eq_ignore_ascii_case(sha256))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use warden_types::run::WorkflowState;

    use super::*;

    fn analysis(repo: &str, path: &str) -> WorkflowAnalysis {
        WorkflowAnalysis {
            repository: repo.to_string(),
            workflow_id: 3,
            workflow_name: "Deploy".to_string(),
            workflow_path: path.to_string(),
            remote_state: WorkflowState::Active,
            total_runs: 5,
            successful_runs: 0,
            failed_runs: 5,
            failure_rate: 100.0,
            consecutive_failures: 5,
            last_successful_run: None,
            recent_runs: Vec::new(),
            should_disable: true,
            disable_reasons: vec!["5 consecutive failures".to_string()],
            issues: Vec::new(),
            fetch_error: None,
        }
    }

    #[tokio::test]
    async fn test_write_lays_out_by_repository() {
        let dir = tempdir().unwrap();
        let store = FileBackupStore::new(dir.path());

        let receipt = store
            .write(&analysis("api", ".github/workflows/deploy.yml"))
            .await
            .unwrap();

        let location = PathBuf::from(&receipt.location);
        assert_eq!(location.parent().unwrap(), dir.path().join("api"));
        let name = location.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("deploy.yml-"));
        assert!(name.ends_with(".json"));

        let bytes = tokio::fs::read(&location).await.unwrap();
        assert_eq!(receipt.sha256, sha256_hex(&bytes));
        assert_eq!(receipt.sha256.len(), 64);
        let restored: WorkflowAnalysis = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(restored.workflow_path, ".github/workflows/deploy.yml");
    }

    #[tokio::test]
    async fn test_verify_detects_tampering() {
        let dir = tempdir().unwrap();
        let store = FileBackupStore::new(dir.path());
        let receipt = store
            .write(&analysis("api", ".github/workflows/ci.yml"))
            .await
            .unwrap();

        assert!(store.verify(&receipt.location, &receipt.sha256).await.unwrap());

        tokio::fs::write(&receipt.location, "{}").await.unwrap();
        assert!(!store.verify(&receipt.location, &receipt.sha256).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_stem_backups_keep_distinct_files() {
        let dir = tempdir().unwrap();
        let store = FileBackupStore::new(dir.path());

        for _ in 0..20 {
            let yml = store
                .write(&analysis("api", ".github/workflows/ci.yml"))
                .await
                .unwrap();
            let yaml = store
                .write(&analysis("api", ".github/workflows/ci.yaml"))
                .await
                .unwrap();

            assert_ne!(yml.location, yaml.location);
            assert!(store.verify(&yml.location, &yml.sha256).await.unwrap());
            assert!(store.verify(&yaml.location, &yaml.sha256).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_verify_missing_backup_is_false() {
        let dir = tempdir().unwrap();
        let store = FileBackupStore::new(dir.path());
        let missing = dir.path().join("api").join("gone.json");
        assert!(!store
            .verify(&missing.display().to_string(), "00")
            .await
            .unwrap());
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
