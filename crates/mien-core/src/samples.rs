//! Sample repository — labeled grayscale samples on disk, one file per
//! sample, named `User.<id>.<sequence>.<ext>`.
//!
//! The naming convention is load-bearing for interop: the second dot-field is
//! the identity id. Entries that do not parse are skipped, never fatal.

use crate::capability::Detector;
use crate::types::{CancelFlag, SampleImage};
use mien_capture::FrameSource;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SAMPLE_PREFIX: &str = "User";
const SAMPLE_EXT: &str = "png";

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("sample io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sample image: {0}")]
    Image(String),
}

/// Per-identity sample collections under one root directory.
pub struct SampleRepository {
    root: PathBuf,
}

impl SampleRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drive a bounded acquisition loop: pull frames, detect, and store one
    /// sample per detected region until `target` samples are stored, the
    /// source ends, or the caller cancels.
    ///
    /// A source failure stops the loop and returns the accumulated count —
    /// an unavailable source is a degraded outcome, not an error. Zero is a
    /// valid return. Cancellation is checked once per iteration.
    pub fn capture(
        &self,
        id: i64,
        target: usize,
        source: &mut dyn FrameSource,
        detector: &dyn Detector,
        cancel: &CancelFlag,
    ) -> Result<usize, SampleError> {
        std::fs::create_dir_all(&self.root)?;

        let mut sequence = self.max_sequence(id)?;
        let mut stored = 0usize;

        while stored < target {
            if cancel.is_cancelled() {
                tracing::info!(id, stored, "capture cancelled");
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::debug!(id, stored, "frame source exhausted");
                    break;
                }
                Err(e) => {
                    tracing::warn!(id, stored, error = %e, "frame source failed; stopping capture");
                    break;
                }
            };

            // A frame can yield several regions; each becomes its own sample.
            for region in detector.detect(&frame) {
                let Some(sample) = SampleImage::crop(&frame, &region) else {
                    tracing::warn!(id, ?region, "skipping degenerate detection region");
                    continue;
                };
                sequence += 1;
                self.store_sample(id, sequence, &sample)?;
                stored += 1;
                if stored >= target {
                    break;
                }
            }
        }

        tracing::info!(id, stored, target, "capture finished");
        Ok(stored)
    }

    /// All samples and their labels, in stable (sorted filename) order.
    pub fn load(&self) -> Result<(Vec<SampleImage>, Vec<i64>), SampleError> {
        self.load_filtered(None)
    }

    /// Samples belonging to a single identity.
    pub fn load_for(&self, id: i64) -> Result<(Vec<SampleImage>, Vec<i64>), SampleError> {
        self.load_filtered(Some(id))
    }

    fn load_filtered(&self, only: Option<i64>) -> Result<(Vec<SampleImage>, Vec<i64>), SampleError> {
        let mut images = Vec::new();
        let mut labels = Vec::new();

        if !self.root.exists() {
            return Ok((images, labels));
        }

        let mut names: Vec<String> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();

        for name in names {
            let Some((label, _sequence)) = parse_sample_name(&name) else {
                tracing::debug!(name = %name, "skipping unparseable sample name");
                continue;
            };
            if only.is_some_and(|id| id != label) {
                continue;
            }

            match image::open(self.root.join(&name)) {
                Ok(img) => {
                    let luma = img.to_luma8();
                    let (width, height) = luma.dimensions();
                    images.push(SampleImage {
                        data: luma.into_raw(),
                        width,
                        height,
                    });
                    labels.push(label);
                }
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "skipping undecodable sample");
                }
            }
        }

        Ok((images, labels))
    }

    /// Remove every sample whose parsed label equals `id`, best-effort.
    ///
    /// Removing zero samples is not an error; individual removal failures are
    /// logged and skipped.
    pub fn delete_for(&self, id: i64) -> Result<usize, SampleError> {
        if !self.root.exists() {
            return Ok(0);
        }

        let mut removed = 0usize;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some((label, _)) = parse_sample_name(name) else {
                continue;
            };
            if label != id {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(name, error = %e, "failed to remove sample"),
            }
        }

        tracing::debug!(id, removed, "removed samples for identity");
        Ok(removed)
    }

    fn store_sample(&self, id: i64, sequence: u32, sample: &SampleImage) -> Result<(), SampleError> {
        let name = sample_name(id, sequence);
        let img = image::GrayImage::from_raw(sample.width, sample.height, sample.data.clone())
            .ok_or_else(|| SampleError::Image("sample buffer does not match dimensions".into()))?;
        img.save(self.root.join(&name))
            .map_err(|e| SampleError::Image(format!("{name}: {e}")))?;
        tracing::debug!(name = %name, "stored sample");
        Ok(())
    }

    /// Highest stored sequence number for an identity, 0 when it has none.
    /// Capture continues from here so sample sets only ever grow.
    fn max_sequence(&self, id: i64) -> Result<u32, SampleError> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut max = 0u32;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some((label, sequence)) = parse_sample_name(name) {
                if label == id && sequence > max {
                    max = sequence;
                }
            }
        }
        Ok(max)
    }
}

fn sample_name(id: i64, sequence: u32) -> String {
    format!("{SAMPLE_PREFIX}.{id}.{sequence}.{SAMPLE_EXT}")
}

/// Parse `User.<id>.<sequence>.<ext>` into `(id, sequence)`.
///
/// Returns `None` for anything else — malformed and foreign filenames are the
/// caller's cue to skip.
fn parse_sample_name(name: &str) -> Option<(i64, u32)> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 4 || parts[0] != SAMPLE_PREFIX {
        return None;
    }
    let id: i64 = parts[1].parse().ok()?;
    let sequence: u32 = parts[2].parse().ok()?;
    (id > 0).then_some((id, sequence))
}
