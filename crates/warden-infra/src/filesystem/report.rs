//! Latest analysis report, stored as `reports/latest.json`.

use std::path::{Path, PathBuf};

use warden_core::repository::store::ReportStore;
use warden_types::analysis::AnalysisReport;
use warden_types::error::StoreError;

use super::{atomic_write, read_json, to_pretty_json};

#[derive(Debug, Clone)]
pub struct JsonReportStore {
    dir: PathBuf,
}

impl JsonReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join("latest.json")
    }

    /// Read a report from an explicit path. A missing file is `Ok(None)`.
    pub async fn load_from(&self, path: &Path) -> Result<Option<AnalysisReport>, StoreError> {
        read_json(path).await
    }

    /// Write `report` to an explicit path, outside the report directory.
    pub async fn export(&self, report: &AnalysisReport, path: &Path) -> Result<(), StoreError> {
        let bytes = to_pretty_json(report, "analysis report")?;
        atomic_write(path, &bytes).await
    }
}

impl ReportStore for JsonReportStore {
    async fn save(&self, report: &AnalysisReport) -> Result<(), StoreError> {
        let path = self.latest_path();
        self.export(report, &path).await?;
        tracing::debug!(path = %path.display(), "report saved");
        Ok(())
    }

    async fn load_latest(&self) -> Result<Option<AnalysisReport>, StoreError> {
        read_json(&self.latest_path()).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;

    fn report(org: &str) -> AnalysisReport {
        AnalysisReport {
            generated_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
            organization: org.to_string(),
            time_window_days: 7,
            repositories_scanned: 0,
            total_repositories: 0,
            total_workflows: 0,
            workflows_to_disable: 0,
            success_rate: 0.0,
            total_runs: 0,
            total_successes: 0,
            total_failures: 0,
            repositories: Vec::new(),
            skipped_repositories: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_no_report_yet() {
        let dir = tempdir().unwrap();
        let store = JsonReportStore::new(dir.path().join("reports"));
        assert!(store.load_latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_latest() {
        let dir = tempdir().unwrap();
        let store = JsonReportStore::new(dir.path().join("reports"));

        store.save(&report("first")).await.unwrap();
        store.save(&report("second")).await.unwrap();

        let latest = store.load_latest().await.unwrap().unwrap();
        assert_eq!(latest.organization, "second");
        assert!(store.latest_path().ends_with("reports/latest.json"));
    }

    #[tokio::test]
    async fn test_export_to_explicit_path() {
        let dir = tempdir().unwrap();
        let store = JsonReportStore::new(dir.path().join("reports"));
        let out = dir.path().join("out").join("report.json");

        store.export(&report("acme"), &out).await.unwrap();

        let text = tokio::fs::read_to_string(&out).await.unwrap();
        assert!(text.contains("\"organization\": \"acme\""));
        let loaded = store.load_from(&out).await.unwrap().unwrap();
        assert_eq!(loaded, report("acme"));
        assert!(store.load_latest().await.unwrap().is_none());
    }
}
