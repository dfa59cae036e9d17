//! Filesystem adapters for Warden.
//!
//! Everything Warden persists lives under one data directory
//! (`~/.warden/` by default):
//!
//! ```text
//! config.toml
//! disabled-workflows.json      manifest
//! audit.log                    JSON lines, append-only
//! reports/latest.json          last complete analysis report
//! backups/<repo>/<file>-<timestamp>-<id>.json
//! ```
//!
//! Whole-file rewrites go through [`atomic_write`] so a crash never leaves a
//! half-written manifest or report behind.

pub mod backup;
pub mod manifest;
pub mod report;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use warden_types::error::StoreError;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "WARDEN_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `WARDEN_DATA_DIR` environment variable
/// 2. `~/.warden`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".warden");
    }

    // Last resort: current directory
    PathBuf::from(".warden")
}

/// File locations inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
    backup_dir: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let backup_dir = root.join("backups");
        Self { root, backup_dir }
    }

    /// Use `backup_dir` instead of `<root>/backups` when set.
    pub fn with_backup_dir(mut self, backup_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = backup_dir {
            self.backup_dir = dir;
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("disabled-workflows.json")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join("audit.log")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Replace `path` with `content` via a temp file, fsync, and rename.
///
/// Parent directories are created as needed.
pub async fn atomic_write(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await.map_err(io_error(&parent))?;

    let tmp_name = format!(
        ".{}.tmp-{}-{}",
        path.file_name().and_then(|v| v.to_str()).unwrap_or("state"),
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0),
    );
    let tmp_path = parent.join(tmp_name);

    let written = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)
            .await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(io_error(path)(e));
    }

    sync_parent_dir(&parent).await.map_err(io_error(&parent))
}

#[cfg(unix)]
async fn sync_parent_dir(parent: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(parent).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent_dir(_parent: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Read and parse a JSON document. A missing file is `Ok(None)`.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path)(e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

pub(crate) fn to_pretty_json<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>, StoreError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Serialize {
        what: what.to_string(),
        message: e.to_string(),
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_atomic_write_creates_parents_and_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        atomic_write(&path, b"first").await.unwrap();
        atomic_write(&path, b"second").await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "second");
        let mut entries = tokio::fs::read_dir(path.parent().unwrap()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["state.json".to_string()]);
    }

    #[tokio::test]
    async fn test_read_json_missing_and_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let missing: Option<serde_json::Value> = read_json(&path).await.unwrap();
        assert!(missing.is_none());

        tokio::fs::write(&path, "{not json").await.unwrap();
        let err = read_json::<serde_json::Value>(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_layout_paths() {
        let layout = DataLayout::new("/home/user/.warden");
        assert_eq!(layout.manifest_path(), PathBuf::from("/home/user/.warden/disabled-workflows.json"));
        assert_eq!(layout.audit_log_path(), PathBuf::from("/home/user/.warden/audit.log"));
        assert_eq!(layout.backup_dir(), Path::new("/home/user/.warden/backups"));

        let custom = layout.with_backup_dir(Some(PathBuf::from("/srv/backups")));
        assert_eq!(custom.backup_dir(), Path::new("/srv/backups"));
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-warden");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-warden"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
