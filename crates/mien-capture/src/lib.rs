//! mien-capture — Frame acquisition for the Mien recognition pipeline.
//!
//! Defines the [`FrameSource`] seam the rest of the system consumes and a
//! directory-backed implementation for file-based streams. Live camera
//! backends plug in behind the same trait.

pub mod frame;
pub mod source;

pub use frame::Frame;
pub use source::{FrameSource, ImageDirSource, SourceError};
