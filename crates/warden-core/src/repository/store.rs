//! Persistence traits for the manifest, workflow backups, the audit log,
//! and analysis reports.

use warden_types::analysis::{AnalysisReport, WorkflowAnalysis};
use warden_types::audit::AuditLogEntry;
use warden_types::error::StoreError;
use warden_types::lifecycle::Manifest;

/// Storage for the manifest of currently disabled workflows.
pub trait ManifestStore: Send + Sync {
    /// Load the manifest. A missing manifest is an empty one.
    fn load(&self) -> impl std::future::Future<Output = Result<Manifest, StoreError>> + Send;

    /// Replace the persisted manifest in one atomic write.
    fn save(
        &self,
        manifest: &Manifest,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// Where a backup landed and what it contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReceipt {
    pub location: String,
    /// SHA-256 hex digest of the bytes written.
    pub sha256: String,
}

/// Storage for pre-disable workflow backups.
pub trait BackupStore: Send + Sync {
    /// Persist the full analysis of a workflow about to be disabled.
    fn write(
        &self,
        analysis: &WorkflowAnalysis,
    ) -> impl std::future::Future<Output = Result<BackupReceipt, StoreError>> + Send;

    /// Check that the backup at `location` still hashes to `sha256`.
    fn verify(
        &self,
        location: &str,
        sha256: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;
}

/// Append-only audit trail.
pub trait AuditLog: Send + Sync {
    /// Durably append one entry.
    fn append(
        &self,
        entry: &AuditLogEntry,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// The most recent `limit` entries, oldest first.
    fn recent(
        &self,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<AuditLogEntry>, StoreError>> + Send;
}

/// Storage for the last complete analysis report.
pub trait ReportStore: Send + Sync {
    fn save(
        &self,
        report: &AnalysisReport,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    fn load_latest(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<AnalysisReport>, StoreError>> + Send;
}
