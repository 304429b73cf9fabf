//! Shared test doubles for the coordinator and repository tests.

use crate::capability::{CapabilityError, Detector, Recognizer};
use crate::identity::{Identity, IdentityStore, StoreError};
use crate::types::{Region, SampleImage};
use mien_capture::{Frame, FrameSource, SourceError};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

pub(crate) fn gray_frame(width: u32, height: u32, value: u8) -> Frame {
    Frame::from_raw(vec![value; (width * height) as usize], width, height).unwrap()
}

pub(crate) fn gray_sample(value: u8) -> SampleImage {
    SampleImage {
        data: vec![value; 64],
        width: 8,
        height: 8,
    }
}

/// Frame source fed from a fixed script; optionally fails after the script
/// is exhausted instead of signaling a clean end-of-stream.
pub(crate) struct ScriptedSource {
    frames: VecDeque<Frame>,
    fail_at_end: bool,
}

impl ScriptedSource {
    pub(crate) fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            fail_at_end: false,
        }
    }

    pub(crate) fn failing_after(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            fail_at_end: true,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if self.fail_at_end => Err(SourceError::ReadFailed("scripted failure".into())),
            None => Ok(None),
        }
    }
}

/// Detector reporting a fixed number of full-frame regions per frame.
pub(crate) struct MultiRegionDetector {
    pub(crate) regions: usize,
}

impl Detector for MultiRegionDetector {
    fn detect(&self, frame: &Frame) -> Vec<Region> {
        (0..self.regions).map(|_| Region::full_frame(frame)).collect()
    }
}

/// In-memory identity store implementing the relational contract.
#[derive(Default)]
pub(crate) struct MemoryIdentityStore {
    rows: RefCell<BTreeMap<i64, Identity>>,
}

impl MemoryIdentityStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_identity(self, identity: Identity) -> Self {
        self.rows.borrow_mut().insert(identity.id, identity);
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.borrow().len()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn next_id(&self) -> Result<i64, StoreError> {
        Ok(self.rows.borrow().keys().next_back().map_or(1, |max| max + 1))
    }

    fn upsert(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut rows = self.rows.borrow_mut();
        let mut record = identity.clone();
        if let Some(existing) = rows.get(&identity.id) {
            record.created_at = existing.created_at;
        }
        rows.insert(identity.id, record);
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        Ok(self.rows.borrow().get(&id).cloned())
    }

    fn list_all(&self) -> Result<Vec<Identity>, StoreError> {
        Ok(self.rows.borrow().values().cloned().collect())
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.rows.borrow_mut().remove(&id);
        Ok(())
    }
}

pub(crate) fn identity(id: i64, name: &str) -> Identity {
    Identity {
        id,
        name: name.to_string(),
        age: Some(30),
        gender: Some("F".to_string()),
        notes: String::new(),
        created_at: chrono::Utc::now(),
    }
}

/// Recognizer whose persistence always fails; train/update succeed.
#[derive(Default)]
pub(crate) struct UnpersistableRecognizer;

impl Recognizer for UnpersistableRecognizer {
    fn train(&mut self, _images: &[SampleImage], _labels: &[i64]) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn update(&mut self, _images: &[SampleImage], _labels: &[i64]) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn predict(&self, _image: &SampleImage) -> Result<(i64, f32), CapabilityError> {
        Err(CapabilityError::Failed("not trained".into()))
    }

    fn persist(&self, _path: &Path) -> Result<(), CapabilityError> {
        Err(CapabilityError::Failed("disk full".into()))
    }

    fn restore(&mut self, _path: &Path) -> Result<(), CapabilityError> {
        Ok(())
    }
}

/// Recognizer whose training always fails.
#[derive(Default)]
pub(crate) struct UntrainableRecognizer;

impl Recognizer for UntrainableRecognizer {
    fn train(&mut self, _images: &[SampleImage], _labels: &[i64]) -> Result<(), CapabilityError> {
        Err(CapabilityError::Failed("numerical blowup".into()))
    }

    fn update(&mut self, _images: &[SampleImage], _labels: &[i64]) -> Result<(), CapabilityError> {
        Err(CapabilityError::Failed("numerical blowup".into()))
    }

    fn predict(&self, _image: &SampleImage) -> Result<(i64, f32), CapabilityError> {
        Err(CapabilityError::Failed("not trained".into()))
    }

    fn persist(&self, _path: &Path) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn restore(&mut self, _path: &Path) -> Result<(), CapabilityError> {
        Ok(())
    }
}
