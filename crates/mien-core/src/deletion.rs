//! Deletion — remove an identity's record and samples together.
//!
//! Deliberately not transactional across the two stores, and deliberately
//! leaves the artifact alone: staleness is surfaced in the result for the
//! caller to act on, never auto-resolved here.

use crate::artifact::ArtifactStore;
use crate::identity::{IdentityStore, StoreError};
use crate::samples::SampleRepository;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeletionError {
    #[error("identity {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct DeletionResult {
    pub id: i64,
    pub name: String,
    pub samples_removed: usize,
    /// True when a persisted artifact still incorporates the deleted label.
    /// The caller decides whether to retrain.
    pub artifact_stale: bool,
}

pub struct DeletionCoordinator<'a, S: IdentityStore + ?Sized> {
    store: &'a S,
    samples: &'a SampleRepository,
    artifact: &'a ArtifactStore,
}

impl<'a, S: IdentityStore + ?Sized> DeletionCoordinator<'a, S> {
    pub fn new(store: &'a S, samples: &'a SampleRepository, artifact: &'a ArtifactStore) -> Self {
        Self {
            store,
            samples,
            artifact,
        }
    }

    /// Delete the identity row, then its samples, each best-effort. A sample
    /// removal failure does not roll back the row.
    pub fn delete(&self, id: i64) -> Result<DeletionResult, DeletionError> {
        let identity = self.store.get(id)?.ok_or(DeletionError::NotFound(id))?;

        self.store.delete(id)?;

        let samples_removed = match self.samples.delete_for(id) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(id, error = %e, "sample removal failed; identity row already deleted");
                0
            }
        };

        let artifact_stale = self.artifact.contains_label(id);
        if artifact_stale {
            tracing::warn!(id, "artifact still incorporates deleted label; retrain to clear it");
        }

        tracing::info!(id, name = %identity.name, samples_removed, "identity deleted");
        Ok(DeletionResult {
            id,
            name: identity.name,
            samples_removed,
            artifact_stale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::GalleryRecognizer;
    use crate::testutil::{identity, MemoryIdentityStore};
    use crate::Recognizer;

    struct Fixture {
        _dir: tempfile::TempDir,
        samples: SampleRepository,
        artifact: ArtifactStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let samples = SampleRepository::new(dir.path().join("samples"));
        let artifact = ArtifactStore::new(dir.path().join("model.json"));
        Fixture {
            samples,
            artifact,
            _dir: dir,
        }
    }

    fn write_sample(fx: &Fixture, id: i64, sequence: u32) {
        std::fs::create_dir_all(fx.samples.root()).unwrap();
        let img = image::GrayImage::from_pixel(4, 4, image::Luma([90u8]));
        img.save(fx.samples.root().join(format!("User.{id}.{sequence}.png")))
            .unwrap();
    }

    #[test]
    fn test_delete_unknown_identity_mutates_nothing() {
        let fx = fixture();
        let store = MemoryIdentityStore::new().with_identity(identity(1, "Ada"));
        let coordinator = DeletionCoordinator::new(&store, &fx.samples, &fx.artifact);

        let result = coordinator.delete(9);
        assert!(matches!(result, Err(DeletionError::NotFound(9))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_removes_row_and_matching_samples_only() {
        let fx = fixture();
        write_sample(&fx, 3, 1);
        write_sample(&fx, 3, 2);
        write_sample(&fx, 4, 1);

        let store = MemoryIdentityStore::new()
            .with_identity(identity(3, "Gone"))
            .with_identity(identity(4, "Kept"));
        let coordinator = DeletionCoordinator::new(&store, &fx.samples, &fx.artifact);

        let result = coordinator.delete(3).unwrap();
        assert_eq!(result.samples_removed, 2);
        assert_eq!(result.name, "Gone");
        assert!(store.get(3).unwrap().is_none());
        assert!(store.get(4).unwrap().is_some());

        let (_, labels) = fx.samples.load().unwrap();
        assert_eq!(labels, vec![4]);
    }

    #[test]
    fn test_delete_reports_staleness_when_artifact_has_label() {
        let fx = fixture();
        write_sample(&fx, 3, 1);

        // Train an artifact incorporating label 3.
        let mut recognizer = GalleryRecognizer::new();
        let (images, labels) = fx.samples.load().unwrap();
        recognizer.train(&images, &labels).unwrap();
        fx.artifact.persist(&recognizer, &labels, images.len()).unwrap();

        let store = MemoryIdentityStore::new().with_identity(identity(3, "Gone"));
        let coordinator = DeletionCoordinator::new(&store, &fx.samples, &fx.artifact);

        let result = coordinator.delete(3).unwrap();
        assert!(result.artifact_stale);
        // Staleness is surfaced, not fixed: the artifact is untouched.
        assert!(fx.artifact.contains_label(3));
    }

    #[test]
    fn test_delete_without_artifact_is_not_stale() {
        let fx = fixture();
        write_sample(&fx, 3, 1);

        let store = MemoryIdentityStore::new().with_identity(identity(3, "Gone"));
        let coordinator = DeletionCoordinator::new(&store, &fx.samples, &fx.artifact);

        let result = coordinator.delete(3).unwrap();
        assert!(!result.artifact_stale);
    }

    #[test]
    fn test_delete_with_no_samples_is_fine() {
        let fx = fixture();
        let store = MemoryIdentityStore::new().with_identity(identity(2, "NoSamples"));
        let coordinator = DeletionCoordinator::new(&store, &fx.samples, &fx.artifact);

        let result = coordinator.delete(2).unwrap();
        assert_eq!(result.samples_removed, 0);
    }
}
