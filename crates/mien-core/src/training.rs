//! Training — the sole writer of the recognition artifact.
//!
//! Rebuilds the artifact wholesale from the sample repository, or extends a
//! persisted one with new samples. Every failure path leaves the previously
//! persisted artifact untouched.

use crate::artifact::{ArtifactError, ArtifactStore};
use crate::capability::{CapabilityError, Recognizer};
use crate::identity::{IdentityStore, StoreError};
use crate::samples::{SampleError, SampleRepository};
use crate::types::SampleImage;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainingError {
    /// The sample repository holds nothing to train on. Reportable, not
    /// fatal — recognition simply stays unavailable.
    #[error("no training data")]
    NoTrainingData,
    #[error("training failed: {source}")]
    TrainingFailed {
        #[source]
        source: CapabilityError,
    },
    #[error(transparent)]
    Samples(#[from] SampleError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingMode {
    Full,
    Incremental,
    /// Incremental was requested with no persisted artifact; a full rebuild
    /// ran instead.
    ColdStart,
}

#[derive(Debug)]
pub struct TrainingReport {
    pub mode: TrainingMode,
    pub samples: usize,
    /// Distinct labels incorporated into the artifact.
    pub identities: usize,
}

/// Cross-store gaps between identity records and the persisted artifact.
/// Both directions are valid states, surfaced for the caller to act on.
#[derive(Debug)]
pub struct StalenessReport {
    /// Identity ids absent from the artifact (enrolled after last training).
    pub untrained: Vec<i64>,
    /// Artifact labels with no identity record (deleted after training).
    pub orphaned: Vec<i64>,
}

impl StalenessReport {
    pub fn is_consistent(&self) -> bool {
        self.untrained.is_empty() && self.orphaned.is_empty()
    }
}

pub struct TrainingCoordinator<'a> {
    samples: &'a SampleRepository,
    artifact: &'a ArtifactStore,
}

impl<'a> TrainingCoordinator<'a> {
    pub fn new(samples: &'a SampleRepository, artifact: &'a ArtifactStore) -> Self {
        Self { samples, artifact }
    }

    /// Train a fresh artifact from every stored sample and persist it,
    /// replacing any prior artifact only after the new one is complete.
    pub fn train_full(
        &self,
        recognizer: &mut dyn Recognizer,
    ) -> Result<TrainingReport, TrainingError> {
        let (images, labels) = self.samples.load()?;
        if images.is_empty() {
            return Err(TrainingError::NoTrainingData);
        }

        tracing::info!(samples = images.len(), "training full artifact");
        recognizer
            .train(&images, &labels)
            .map_err(|source| TrainingError::TrainingFailed { source })?;

        let manifest = self.artifact.persist(recognizer, &labels, images.len())?;

        Ok(TrainingReport {
            mode: TrainingMode::Full,
            samples: images.len(),
            identities: manifest.labels.len(),
        })
    }

    /// Extend the persisted artifact with new samples. With no persisted
    /// artifact this falls back to a full rebuild of the repository
    /// (cold start).
    pub fn update_incremental(
        &self,
        recognizer: &mut dyn Recognizer,
        images: &[SampleImage],
        labels: &[i64],
    ) -> Result<TrainingReport, TrainingError> {
        if !self.artifact.exists() {
            tracing::info!("no persisted artifact; falling back to full training");
            let mut report = self.train_full(recognizer)?;
            report.mode = TrainingMode::ColdStart;
            return Ok(report);
        }

        if images.is_empty() {
            return Err(TrainingError::NoTrainingData);
        }

        recognizer
            .restore(self.artifact.model_path())
            .map_err(|source| TrainingError::TrainingFailed { source })?;
        recognizer
            .update(images, labels)
            .map_err(|source| TrainingError::TrainingFailed { source })?;

        let prior = self.artifact.manifest()?;
        let mut merged: Vec<i64> = prior
            .as_ref()
            .map(|m| m.labels.clone())
            .unwrap_or_default();
        merged.extend_from_slice(labels);
        let sample_count = prior.map_or(0, |m| m.sample_count) + images.len();

        let manifest = self.artifact.persist(recognizer, &merged, sample_count)?;

        tracing::info!(added = images.len(), "extended artifact");
        Ok(TrainingReport {
            mode: TrainingMode::Incremental,
            samples: sample_count,
            identities: manifest.labels.len(),
        })
    }

    /// Compare identity records against the artifact manifest.
    pub fn staleness<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<StalenessReport, StoreError> {
        let ids: BTreeSet<i64> = store.list_all()?.iter().map(|i| i.id).collect();
        let labels: BTreeSet<i64> = match self.artifact.manifest() {
            Ok(Some(manifest)) => manifest.labels.into_iter().collect(),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read artifact manifest");
                BTreeSet::new()
            }
        };

        Ok(StalenessReport {
            untrained: ids.difference(&labels).copied().collect(),
            orphaned: labels.difference(&ids).copied().collect(),
        })
    }
}
