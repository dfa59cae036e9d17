//! Remote mutation boundary.
//!
//! Changing a workflow's state on the CI provider is not performed by the
//! core. The lifecycle manager calls a [`RemoteMutator`] and records what it
//! reports; the manifest and backups are the durable record that a change
//! is pending or has happened.

use std::fmt;

use warden_types::error::RemoteError;
use warden_types::lifecycle::DisabledWorkflowRecord;

/// What the remote side did with a requested change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteMutation {
    /// The provider state was changed.
    Applied,
    /// Recorded only; the provider state is unchanged and must be changed
    /// by an external process.
    Deferred,
}

impl fmt::Display for RemoteMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteMutation::Applied => write!(f, "applied"),
            RemoteMutation::Deferred => write!(f, "deferred"),
        }
    }
}

/// Capability to disable/re-enable a workflow on the CI provider.
pub trait RemoteMutator: Send + Sync {
    fn disable(
        &self,
        record: &DisabledWorkflowRecord,
    ) -> impl std::future::Future<Output = Result<RemoteMutation, RemoteError>> + Send;

    fn restore(
        &self,
        record: &DisabledWorkflowRecord,
    ) -> impl std::future::Future<Output = Result<RemoteMutation, RemoteError>> + Send;
}
