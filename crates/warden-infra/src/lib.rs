//! Infrastructure layer for Warden.
//!
//! Contains implementations of the port traits defined in `warden-core`:
//! the GitHub REST data source, file-backed manifest, backup and report
//! stores, the JSON-lines audit log, the configuration loader, and the
//! deferred remote mutator.

pub mod audit;
pub mod config;
pub mod filesystem;
pub mod github;
pub mod remote;

pub use audit::JsonlAuditLog;
pub use filesystem::backup::FileBackupStore;
pub use filesystem::manifest::JsonManifestStore;
pub use filesystem::report::JsonReportStore;
pub use filesystem::{DataLayout, resolve_data_dir};
pub use github::GitHubDataSource;
pub use remote::DeferredRemoteMutator;
