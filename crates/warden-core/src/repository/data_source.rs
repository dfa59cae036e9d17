//! CI data source trait definition.
//!
//! Yields repositories, workflows, run histories, and raw workflow
//! definitions. Implementations handle pagination and map provider failures
//! onto [`DataSourceError`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use warden_types::error::DataSourceError;
use warden_types::run::{QuotaStatus, Run, WorkflowDescriptor};

/// Read-only access to an organization's CI data.
pub trait DataSource: Send + Sync {
    /// Repository names owned by `organization`, minus `exclude`, in the
    /// provider's order.
    fn list_repositories(
        &self,
        organization: &str,
        exclude: &BTreeSet<String>,
    ) -> impl std::future::Future<Output = Result<Vec<String>, DataSourceError>> + Send;

    /// Workflow descriptors for a repository, in the provider's order.
    fn list_workflows(
        &self,
        repository: &str,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowDescriptor>, DataSourceError>> + Send;

    /// Runs created at or after `since`, most recent first.
    fn list_runs(
        &self,
        repository: &str,
        workflow_id: u64,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Run>, DataSourceError>> + Send;

    /// Raw definition text, or `None` if the file does not exist.
    fn get_definition_content(
        &self,
        repository: &str,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, DataSourceError>> + Send;

    /// Current request quota.
    fn check_quota(
        &self,
    ) -> impl std::future::Future<Output = Result<QuotaStatus, DataSourceError>> + Send;
}
