//! Application state wiring the stores together.
//!
//! The lifecycle manager is generic over its stores; AppState pins it to the
//! concrete file-backed implementations under the data directory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use warden_core::lifecycle::LifecycleManager;
use warden_infra::config::load_config;
use warden_infra::{
    DataLayout, DeferredRemoteMutator, FileBackupStore, JsonManifestStore, JsonReportStore,
    JsonlAuditLog, resolve_data_dir,
};
use warden_types::config::AuditConfig;

/// Concrete lifecycle manager pinned to infra implementations.
pub type ConcreteLifecycleManager =
    LifecycleManager<JsonManifestStore, FileBackupStore, JsonlAuditLog, DeferredRemoteMutator>;

pub struct AppState {
    pub config: AuditConfig,
    pub config_path: PathBuf,
    pub layout: DataLayout,
    pub lifecycle: ConcreteLifecycleManager,
    pub reports: JsonReportStore,
}

impl AppState {
    /// Resolve the data directory, load configuration, and wire the stores.
    pub async fn init(config_override: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let base = DataLayout::new(&data_dir);
        let config_path = config_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.config_path());
        let config = load_config(&config_path).await?;
        let layout = base.with_backup_dir(config.backup_dir.clone());

        tracing::debug!(
            data_dir = %layout.root().display(),
            config = %config_path.display(),
            organization = %config.organization,
            "application state initialised"
        );

        let lifecycle = LifecycleManager::new(
            JsonManifestStore::new(layout.manifest_path()),
            FileBackupStore::new(layout.backup_dir()),
            JsonlAuditLog::new(layout.audit_log_path()),
            DeferredRemoteMutator::new(),
        )
        .with_safelist(config.safelisted_workflows.clone());

        let reports = JsonReportStore::new(layout.reports_dir());

        Ok(Self {
            config,
            config_path,
            layout,
            lifecycle,
            reports,
        })
    }
}
