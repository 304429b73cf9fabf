//! Reconciliation of raw predictions against the identity store.
//!
//! A predicted label is never assumed to reference a live identity record —
//! deletion and retraining are not transactionally linked, so the decision is
//! three-way: Recognized, Unknown, or OrphanLabel.

use crate::capability::{Detector, Recognizer};
use crate::identity::{Identity, IdentityStore, StoreError};
use crate::types::{Prediction, Region, SampleImage};
use mien_capture::Frame;

/// Display-ready decision for one detected face.
#[derive(Debug, Clone)]
pub enum RecognitionDecision {
    /// The label matched below threshold and has an identity record.
    Recognized {
        identity: Identity,
        region: Region,
        distance: f32,
    },
    /// The distance was at or above threshold; no store lookup was made.
    Unknown { region: Region, distance: f32 },
    /// The label matched below threshold but no identity record exists —
    /// deleted after training, or never recorded.
    OrphanLabel {
        label: i64,
        region: Region,
        distance: f32,
    },
}

pub struct Reconciler<'a, S: IdentityStore + ?Sized> {
    store: &'a S,
    /// Dissimilarity threshold: lower = stricter matching, higher = more
    /// permissive.
    threshold: f32,
}

impl<'a, S: IdentityStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, threshold: f32) -> Self {
        Self { store, threshold }
    }

    /// Decide every prediction independently.
    pub fn reconcile(
        &self,
        predictions: &[Prediction],
    ) -> Result<Vec<RecognitionDecision>, StoreError> {
        predictions.iter().map(|p| self.decide(p)).collect()
    }

    fn decide(&self, prediction: &Prediction) -> Result<RecognitionDecision, StoreError> {
        // At or above threshold it will not be shown as a match, so the
        // store lookup is skipped entirely.
        if prediction.distance >= self.threshold {
            return Ok(RecognitionDecision::Unknown {
                region: prediction.region,
                distance: prediction.distance,
            });
        }

        match self.store.get(prediction.label)? {
            Some(identity) => Ok(RecognitionDecision::Recognized {
                identity,
                region: prediction.region,
                distance: prediction.distance,
            }),
            None => {
                tracing::debug!(
                    label = prediction.label,
                    "matched label has no identity record"
                );
                Ok(RecognitionDecision::OrphanLabel {
                    label: prediction.label,
                    region: prediction.region,
                    distance: prediction.distance,
                })
            }
        }
    }
}

/// Detect faces in one frame and predict a label for each region.
///
/// Regions whose prediction fails are skipped with a warning; detection
/// yielding nothing is an empty result, not an error.
pub fn scan_frame(
    frame: &Frame,
    detector: &dyn Detector,
    recognizer: &dyn Recognizer,
) -> Vec<Prediction> {
    let mut predictions = Vec::new();

    for region in detector.detect(frame) {
        let Some(sample) = SampleImage::crop(frame, &region) else {
            continue;
        };
        match recognizer.predict(&sample) {
            Ok((label, distance)) => predictions.push(Prediction {
                region,
                label,
                distance,
            }),
            Err(e) => tracing::warn!(error = %e, "prediction failed for detected region"),
        }
    }

    predictions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::FullFrameDetector;
    use crate::gallery::GalleryRecognizer;
    use crate::testutil::{gray_frame, gray_sample, identity, MemoryIdentityStore};

    fn prediction(label: i64, distance: f32) -> Prediction {
        Prediction {
            region: Region {
                x: 0,
                y: 0,
                width: 8,
                height: 8,
            },
            label,
            distance,
        }
    }

    #[test]
    fn test_below_threshold_with_record_is_recognized() {
        let store = MemoryIdentityStore::new().with_identity(identity(3, "Ada"));
        let reconciler = Reconciler::new(&store, 70.0);

        let decisions = reconciler.reconcile(&[prediction(3, 50.0)]).unwrap();
        match &decisions[0] {
            RecognitionDecision::Recognized {
                identity, distance, ..
            } => {
                assert_eq!(identity.id, 3);
                assert_eq!(identity.name, "Ada");
                assert_eq!(*distance, 50.0);
            }
            other => panic!("expected Recognized, got {other:?}"),
        }
    }

    #[test]
    fn test_at_or_above_threshold_is_unknown_regardless_of_record() {
        let store = MemoryIdentityStore::new().with_identity(identity(3, "Ada"));
        let reconciler = Reconciler::new(&store, 70.0);

        let decisions = reconciler
            .reconcile(&[prediction(3, 90.0), prediction(3, 70.0)])
            .unwrap();
        assert!(matches!(decisions[0], RecognitionDecision::Unknown { .. }));
        assert!(matches!(decisions[1], RecognitionDecision::Unknown { .. }));
    }

    #[test]
    fn test_below_threshold_without_record_is_orphan_label() {
        // Identity 7 was deleted after the artifact was trained.
        let store = MemoryIdentityStore::new();
        let reconciler = Reconciler::new(&store, 70.0);

        let decisions = reconciler.reconcile(&[prediction(7, 10.0)]).unwrap();
        match &decisions[0] {
            RecognitionDecision::OrphanLabel { label, distance, .. } => {
                assert_eq!(*label, 7);
                assert_eq!(*distance, 10.0);
            }
            other => panic!("expected OrphanLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_decisions_are_per_prediction_independent() {
        let store = MemoryIdentityStore::new().with_identity(identity(1, "Ada"));
        let reconciler = Reconciler::new(&store, 70.0);

        let decisions = reconciler
            .reconcile(&[prediction(1, 20.0), prediction(2, 20.0), prediction(1, 95.0)])
            .unwrap();
        assert!(matches!(decisions[0], RecognitionDecision::Recognized { .. }));
        assert!(matches!(decisions[1], RecognitionDecision::OrphanLabel { .. }));
        assert!(matches!(decisions[2], RecognitionDecision::Unknown { .. }));
    }

    #[test]
    fn test_scan_frame_predicts_per_region() {
        let mut recognizer = GalleryRecognizer::new();
        recognizer.train(&[gray_sample(40)], &[6]).unwrap();

        let frame = gray_frame(8, 8, 40);
        let predictions = scan_frame(&frame, &FullFrameDetector, &recognizer);
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].label, 6);
        assert!(predictions[0].distance < 1.0);
    }

    #[test]
    fn test_scan_frame_untrained_recognizer_yields_nothing() {
        let recognizer = GalleryRecognizer::new();
        let frame = gray_frame(8, 8, 40);
        let predictions = scan_frame(&frame, &FullFrameDetector, &recognizer);
        assert!(predictions.is_empty());
    }
}
