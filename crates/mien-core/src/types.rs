use mien_capture::Frame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pixel-space region of a detected face within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// The region covering an entire frame.
    pub fn full_frame(frame: &Frame) -> Self {
        Self {
            x: 0,
            y: 0,
            width: frame.width,
            height: frame.height,
        }
    }
}

/// A single-channel sample image, either freshly cropped from a frame or
/// loaded back from the sample repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleImage {
    /// Grayscale pixel data (width * height bytes, row-major).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl SampleImage {
    /// Crop a detection region out of a frame, clamped to the frame bounds.
    ///
    /// Returns `None` when the clamped region has no area.
    pub fn crop(frame: &Frame, region: &Region) -> Option<Self> {
        let x = region.x.min(frame.width);
        let y = region.y.min(frame.height);
        let width = region.width.min(frame.width - x);
        let height = region.height.min(frame.height - y);
        if width == 0 || height == 0 {
            return None;
        }

        let mut data = Vec::with_capacity((width * height) as usize);
        for row in y..y + height {
            let start = (row * frame.width + x) as usize;
            data.extend_from_slice(&frame.data[start..start + width as usize]);
        }

        Some(Self {
            data,
            width,
            height,
        })
    }
}

/// One raw prediction from the recognition capability, prior to
/// reconciliation against the identity store.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub region: Region,
    /// Label predicted by the artifact; equal in value-space to an identity
    /// id, but not guaranteed to reference an existing record.
    pub label: i64,
    /// Dissimilarity score. Lower means more similar.
    pub distance: f32,
}

/// Cooperative cancellation signal for capture loops.
///
/// Checked once per loop iteration; never pre-empts an in-progress write.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
