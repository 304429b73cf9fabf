//! Persisted recognition artifact and its manifest.
//!
//! The artifact itself is opaque — the capability writes and reads it. This
//! module owns the path, the atomic replace discipline, and the manifest: the
//! lifecycle manager's record of which labels the persisted artifact
//! incorporates. Absence of the artifact file means "untrained", not an
//! error.

use crate::capability::{CapabilityError, Recognizer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact manifest: {0}")]
    Manifest(String),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// What the persisted artifact was trained from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub trained_at: DateTime<Utc>,
    /// Sorted, distinct labels incorporated into the artifact.
    pub labels: Vec<i64>,
    pub sample_count: usize,
}

impl ArtifactManifest {
    pub fn contains_label(&self, id: i64) -> bool {
        self.labels.binary_search(&id).is_ok()
    }
}

/// The single shared artifact slot: one writer (the training coordinator),
/// many readers.
pub struct ArtifactStore {
    model_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.model_path.with_extension("manifest.json")
    }

    /// Whether a trained artifact is currently persisted.
    pub fn exists(&self) -> bool {
        self.model_path.exists()
    }

    /// Persist the trained state atomically: write to a temporary sibling,
    /// then rename over the prior artifact. A failed write leaves the prior
    /// artifact intact. The manifest is written the same way afterwards.
    pub fn persist(
        &self,
        recognizer: &dyn Recognizer,
        labels: &[i64],
        sample_count: usize,
    ) -> Result<ArtifactManifest, ArtifactError> {
        if let Some(parent) = self.model_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = temp_sibling(&self.model_path);
        if let Err(e) = recognizer.persist(&tmp) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        std::fs::rename(&tmp, &self.model_path)?;

        let mut sorted: Vec<i64> = labels.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let manifest = ArtifactManifest {
            trained_at: Utc::now(),
            labels: sorted,
            sample_count,
        };

        let manifest_path = self.manifest_path();
        let tmp = temp_sibling(&manifest_path);
        let body = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| ArtifactError::Manifest(e.to_string()))?;
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &manifest_path)?;

        tracing::info!(
            path = %self.model_path.display(),
            labels = manifest.labels.len(),
            samples = manifest.sample_count,
            "persisted recognition artifact"
        );

        Ok(manifest)
    }

    /// The manifest of the persisted artifact, `None` when untrained.
    pub fn manifest(&self) -> Result<Option<ArtifactManifest>, ArtifactError> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let manifest = serde_json::from_slice(&bytes)
            .map_err(|e| ArtifactError::Manifest(format!("{}: {e}", path.display())))?;
        Ok(Some(manifest))
    }

    /// Whether the persisted artifact incorporates a label. An unreadable
    /// manifest reads as "not present" with a warning.
    pub fn contains_label(&self, id: i64) -> bool {
        match self.manifest() {
            Ok(Some(manifest)) => manifest.contains_label(id),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "could not read artifact manifest");
                false
            }
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
