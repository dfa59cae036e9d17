//! JSON manifest of disabled workflows.

use std::path::PathBuf;

use warden_core::repository::store::ManifestStore;
use warden_types::error::StoreError;
use warden_types::lifecycle::Manifest;

use super::{atomic_write, read_json, to_pretty_json};

/// Manifest persisted as one JSON document, rewritten atomically on save.
#[derive(Debug, Clone)]
pub struct JsonManifestStore {
    path: PathBuf,
}

impl JsonManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ManifestStore for JsonManifestStore {
    async fn load(&self) -> Result<Manifest, StoreError> {
        match read_json::<Manifest>(&self.path).await? {
            Some(manifest) => {
                tracing::debug!(
                    path = %self.path.display(),
                    workflows = manifest.len(),
                    "loaded manifest"
                );
                Ok(manifest)
            }
            None => {
                tracing::debug!(path = %self.path.display(), "no manifest yet, starting empty");
                Ok(Manifest::default())
            }
        }
    }

    async fn save(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let bytes = to_pretty_json(manifest, "manifest")?;
        atomic_write(&self.path, &bytes).await?;
        tracing::debug!(
            path = %self.path.display(),
            workflows = manifest.len(),
            "manifest saved"
        );
        Ok(())
    }
}
