//! mien-core — Identity lifecycle and consistency management.
//!
//! Keeps three loosely-coupled stores — identity records, per-identity sample
//! collections, and one trained recognition artifact — mutually consistent
//! across enroll, retrain, and delete, and reconciles recognition output
//! against identity records that may have been deleted or never trained.
//! Detection and recognition themselves are pluggable capabilities behind
//! the traits in [`capability`].

pub mod artifact;
pub mod capability;
pub mod config;
pub mod deletion;
pub mod enroll;
pub mod gallery;
pub mod identity;
pub mod reconcile;
pub mod samples;
pub mod training;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use capability::{CapabilityError, Detector, FullFrameDetector, Recognizer};
pub use gallery::GalleryRecognizer;
pub use identity::{Identity, IdentityStore, StoreError};
pub use types::{CancelFlag, Prediction, Region, SampleImage};
