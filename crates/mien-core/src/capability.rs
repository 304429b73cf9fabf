//! External capability seams — detection and recognition.
//!
//! The core orchestrates these; it never implements the statistics itself.
//! [`GalleryRecognizer`](crate::gallery::GalleryRecognizer) is the built-in
//! default recognizer; real detectors and heavier models plug in behind the
//! same traits.

use crate::types::{Region, SampleImage};
use mien_capture::Frame;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("capability failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Visual detection capability: zero or more face regions per frame.
pub trait Detector {
    fn detect(&self, frame: &Frame) -> Vec<Region>;
}

/// Detector that reports the entire frame as a single region.
///
/// Suitable for sources that already deliver face crops (curated image
/// directories); a model-backed detector replaces it for raw scenes.
pub struct FullFrameDetector;

impl Detector for FullFrameDetector {
    fn detect(&self, frame: &Frame) -> Vec<Region> {
        if frame.width == 0 || frame.height == 0 {
            return Vec::new();
        }
        vec![Region::full_frame(frame)]
    }
}

/// Statistical recognition capability over integer-labeled samples.
///
/// The trained state is the recognition artifact: opaque to the core,
/// persisted to and restored from a single path by the training coordinator.
pub trait Recognizer {
    /// Train a fresh model from the full sample set, replacing any state.
    fn train(&mut self, images: &[SampleImage], labels: &[i64]) -> Result<(), CapabilityError>;

    /// Extend the current model with additional samples.
    fn update(&mut self, images: &[SampleImage], labels: &[i64]) -> Result<(), CapabilityError>;

    /// Predict the best label for a probe image, with its dissimilarity
    /// distance (lower = more similar).
    fn predict(&self, image: &SampleImage) -> Result<(i64, f32), CapabilityError>;

    /// Write the trained state to `path`.
    fn persist(&self, path: &Path) -> Result<(), CapabilityError>;

    /// Replace the in-memory state with the artifact at `path`.
    fn restore(&mut self, path: &Path) -> Result<(), CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_frame_detector_single_region() {
        let frame = Frame::from_raw(vec![0u8; 6], 3, 2).unwrap();
        let regions = FullFrameDetector.detect(&frame);
        assert_eq!(regions.len(), 1);
        assert_eq!(
            regions[0],
            Region {
                x: 0,
                y: 0,
                width: 3,
                height: 2
            }
        );
    }

    #[test]
    fn test_full_frame_detector_empty_frame() {
        let frame = Frame {
            data: vec![],
            width: 0,
            height: 0,
        };
        assert!(FullFrameDetector.detect(&frame).is_empty());
    }
}
