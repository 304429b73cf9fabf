//! Built-in nearest-neighbor recognizer over normalized grayscale patches.
//!
//! Every training sample is resized to a fixed patch; prediction compares the
//! probe against the whole gallery and returns the closest entry's label with
//! a mean-absolute-difference distance on a 0–255 scale. An identical probe
//! scores ~0; the default reconciliation threshold of 70 is calibrated to
//! this scale.

use crate::capability::{CapabilityError, Recognizer};
use crate::types::SampleImage;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

const PATCH_SIZE: usize = 32;
const MODEL_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct GalleryEntry {
    label: i64,
    patch: Vec<u8>,
}

/// Default [`Recognizer`] implementation. Persisted as versioned JSON.
#[derive(Serialize, Deserialize)]
pub struct GalleryRecognizer {
    version: u32,
    entries: Vec<GalleryEntry>,
}

impl GalleryRecognizer {
    pub fn new() -> Self {
        Self {
            version: MODEL_VERSION,
            entries: Vec::new(),
        }
    }

    /// Number of samples incorporated into the gallery.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ingest(
        images: &[SampleImage],
        labels: &[i64],
    ) -> Result<Vec<GalleryEntry>, CapabilityError> {
        if images.len() != labels.len() {
            return Err(CapabilityError::Failed(format!(
                "images/labels length mismatch: {} vs {}",
                images.len(),
                labels.len()
            )));
        }
        images
            .iter()
            .zip(labels)
            .map(|(image, &label)| {
                Ok(GalleryEntry {
                    label,
                    patch: normalize_patch(image)?,
                })
            })
            .collect()
    }
}

impl Default for GalleryRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for GalleryRecognizer {
    fn train(&mut self, images: &[SampleImage], labels: &[i64]) -> Result<(), CapabilityError> {
        if images.is_empty() {
            return Err(CapabilityError::Failed("no samples to train on".into()));
        }
        self.entries = Self::ingest(images, labels)?;
        tracing::debug!(entries = self.entries.len(), "trained gallery");
        Ok(())
    }

    fn update(&mut self, images: &[SampleImage], labels: &[i64]) -> Result<(), CapabilityError> {
        let new = Self::ingest(images, labels)?;
        self.entries.extend(new);
        tracing::debug!(entries = self.entries.len(), "extended gallery");
        Ok(())
    }

    fn predict(&self, image: &SampleImage) -> Result<(i64, f32), CapabilityError> {
        if self.entries.is_empty() {
            return Err(CapabilityError::Failed("gallery is empty".into()));
        }
        let probe = normalize_patch(image)?;

        let mut best_label = self.entries[0].label;
        let mut best_distance = f32::INFINITY;

        // Full traversal of the gallery, no early exit.
        for entry in &self.entries {
            let distance = patch_distance(&probe, &entry.patch);
            if distance < best_distance {
                best_distance = distance;
                best_label = entry.label;
            }
        }

        Ok((best_label, best_distance))
    }

    fn persist(&self, path: &Path) -> Result<(), CapabilityError> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)
            .map_err(|e| CapabilityError::Failed(format!("serialize gallery model: {e}")))?;
        writer.flush()?;
        Ok(())
    }

    fn restore(&mut self, path: &Path) -> Result<(), CapabilityError> {
        let bytes = std::fs::read(path)?;
        let model: GalleryRecognizer = serde_json::from_slice(&bytes)
            .map_err(|e| CapabilityError::Failed(format!("parse gallery model: {e}")))?;
        if model.version != MODEL_VERSION {
            return Err(CapabilityError::Failed(format!(
                "unsupported gallery model version {}",
                model.version
            )));
        }
        *self = model;
        Ok(())
    }
}

/// Resize a sample to the canonical patch using bilinear interpolation.
fn normalize_patch(image: &SampleImage) -> Result<Vec<u8>, CapabilityError> {
    let width = image.width as usize;
    let height = image.height as usize;
    if width == 0 || height == 0 || image.data.len() < width * height {
        return Err(CapabilityError::Failed(
            "empty or truncated sample image".into(),
        ));
    }

    let scale_x = width as f32 / PATCH_SIZE as f32;
    let scale_y = height as f32 / PATCH_SIZE as f32;
    let mut patch = vec![0u8; PATCH_SIZE * PATCH_SIZE];

    for y in 0..PATCH_SIZE {
        let src_y = (y as f32 + 0.5) * scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..PATCH_SIZE {
            let src_x = (x as f32 + 0.5) * scale_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, width as i32 - 1) as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            let tl = image.data[y0 * width + x0] as f32;
            let tr = image.data[y0 * width + x1] as f32;
            let bl = image.data[y1 * width + x0] as f32;
            let br = image.data[y1 * width + x1] as f32;

            let val = tl * (1.0 - fx) * (1.0 - fy)
                + tr * fx * (1.0 - fy)
                + bl * (1.0 - fx) * fy
                + br * fx * fy;

            patch[y * PATCH_SIZE + x] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    Ok(patch)
}

/// Mean absolute difference between two patches (0.0–255.0).
fn patch_distance(a: &[u8], b: &[u8]) -> f32 {
    let sum: f32 = a
        .iter()
        .zip(b)
        .map(|(&p, &q)| (p as f32 - q as f32).abs())
        .sum();
    sum / a.len() as f32
}
