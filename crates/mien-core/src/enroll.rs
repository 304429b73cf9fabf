//! Enrollment — capture samples first, commit the identity record second.

use crate::capability::Detector;
use crate::identity::{Identity, IdentityStore, StoreError};
use crate::samples::{SampleError, SampleRepository};
use crate::types::CancelFlag;
use chrono::Utc;
use mien_capture::FrameSource;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Samples(#[from] SampleError),
    #[error("identity {0} not found")]
    NotFound(i64),
}

/// Validated metadata for a new identity. Name emptiness is rejected at the
/// boundary; the coordinator assumes it holds.
#[derive(Debug, Clone)]
pub struct EnrollmentProfile {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub notes: String,
}

#[derive(Debug)]
pub struct EnrollmentResult {
    pub id: i64,
    pub captured: usize,
    /// Whether the identity record was written. False iff zero samples were
    /// captured — no record is created without trainable data.
    pub committed: bool,
}

pub struct EnrollmentCoordinator<'a, S: IdentityStore + ?Sized> {
    store: &'a S,
    samples: &'a SampleRepository,
}

impl<'a, S: IdentityStore + ?Sized> EnrollmentCoordinator<'a, S> {
    pub fn new(store: &'a S, samples: &'a SampleRepository) -> Self {
        Self { store, samples }
    }

    /// Enroll a new identity: assign the next id, capture samples, and
    /// commit the record only if at least one sample was stored.
    pub fn enroll(
        &self,
        profile: EnrollmentProfile,
        target: usize,
        source: &mut dyn FrameSource,
        detector: &dyn Detector,
        cancel: &CancelFlag,
    ) -> Result<EnrollmentResult, EnrollError> {
        let id = self.store.next_id()?;
        tracing::info!(id, name = %profile.name, target, "starting enrollment capture");

        let captured = self.samples.capture(id, target, source, detector, cancel)?;

        if captured == 0 {
            tracing::warn!(id, "no samples captured; identity not committed");
            return Ok(EnrollmentResult {
                id,
                captured,
                committed: false,
            });
        }

        self.store.upsert(&Identity {
            id,
            name: profile.name,
            age: profile.age,
            gender: profile.gender,
            notes: profile.notes,
            created_at: Utc::now(),
        })?;

        tracing::info!(id, captured, "identity committed");
        Ok(EnrollmentResult {
            id,
            captured,
            committed: true,
        })
    }

    /// Capture additional samples for an existing identity. The record is
    /// not touched; sequence numbering continues from the current maximum.
    pub fn augment(
        &self,
        id: i64,
        target: usize,
        source: &mut dyn FrameSource,
        detector: &dyn Detector,
        cancel: &CancelFlag,
    ) -> Result<usize, EnrollError> {
        if self.store.get(id)?.is_none() {
            return Err(EnrollError::NotFound(id));
        }
        Ok(self.samples.capture(id, target, source, detector, cancel)?)
    }
}
