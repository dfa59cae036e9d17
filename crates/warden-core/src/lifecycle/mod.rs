//! Lifecycle manager: manifest-backed disable and restore transitions.
//!
//! Both transitions follow the same shape:
//!
//! 1. Load the persisted [`Manifest`](warden_types::lifecycle::Manifest) once.
//! 2. Walk the candidates sequentially, writing backups and audit entries as
//!    they go and applying changes to an in-memory copy of the manifest.
//!    A failure affects only the workflow it happened on.
//! 3. Persist the manifest once, atomically, if anything changed.
//!
//! Dry runs walk the same candidates but write no backup, leave the manifest
//! untouched, and mark every audit entry as simulated.
//!
//! The manager never edits workflow definitions on the CI provider itself;
//! it asks a [`RemoteMutator`] and records what that reports.

pub mod disable;
pub mod restore;

use std::collections::BTreeSet;

use thiserror::Error;
use warden_types::error::StoreError;

use crate::audit::AuditRecorder;
use crate::repository::remote::RemoteMutator;
use crate::repository::store::{AuditLog, BackupStore, ManifestStore};

/// Errors that abort a lifecycle transition as a whole. Per-workflow
/// failures are reported in the summary instead.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to load the disabled-workflow manifest: {0}")]
    ManifestLoad(#[source] StoreError),

    #[error(
        "failed to write the disabled-workflow manifest; {pending} change(s) were not recorded \
         (backups and audit entries remain): {source}"
    )]
    ManifestWrite {
        pending: usize,
        #[source]
        source: StoreError,
    },

    #[error("restore needs a --repo or --workflow filter, or --all")]
    MissingRestoreFilter,
}

pub struct LifecycleManager<M, B, A, R>
where
    M: ManifestStore,
    B: BackupStore,
    A: AuditLog,
    R: RemoteMutator,
{
    manifest: M,
    backups: B,
    audit: AuditRecorder<A>,
    remote: R,
    /// Current safelist, re-checked at disable time.
    safelist: BTreeSet<String>,
}

impl<M, B, A, R> LifecycleManager<M, B, A, R>
where
    M: ManifestStore,
    B: BackupStore,
    A: AuditLog,
    R: RemoteMutator,
{
    pub fn new(manifest: M, backups: B, audit_log: A, remote: R) -> Self {
        Self {
            manifest,
            backups,
            audit: AuditRecorder::new(audit_log),
            remote,
            safelist: BTreeSet::new(),
        }
    }

    pub fn with_safelist(mut self, safelist: BTreeSet<String>) -> Self {
        self.safelist = safelist;
        self
    }

    pub fn manifest_store(&self) -> &M {
        &self.manifest
    }

    pub fn audit(&self) -> &AuditRecorder<A> {
        &self.audit
    }
}
