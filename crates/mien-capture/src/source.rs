//! Frame sources — the acquisition seam between the pipeline and the device.

use crate::frame::Frame;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source not found: {0}")]
    NotFound(String),
    #[error("source read failed: {0}")]
    ReadFailed(String),
}

/// A stream of grayscale frames.
///
/// `Ok(None)` signals end-of-stream. An `Err` means the source itself failed;
/// callers are expected to stop pulling and keep whatever they already have.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Frame source backed by a directory of image files.
///
/// Files are streamed in sorted name order, one frame per file. Files that
/// fail to decode are skipped with a warning rather than ending the stream.
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    cursor: usize,
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "pgm"];

impl ImageDirSource {
    /// Open a directory as a frame stream.
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        if !dir.is_dir() {
            return Err(SourceError::NotFound(dir.display().to_string()));
        }

        let entries = std::fs::read_dir(dir)
            .map_err(|e| SourceError::ReadFailed(format!("{}: {e}", dir.display())))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        tracing::debug!(dir = %dir.display(), frames = paths.len(), "opened image directory source");

        Ok(Self { paths, cursor: 0 })
    }

    /// Number of frames remaining in the stream.
    pub fn remaining(&self) -> usize {
        self.paths.len().saturating_sub(self.cursor)
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        while self.cursor < self.paths.len() {
            let path = &self.paths[self.cursor];
            self.cursor += 1;

            match image::open(path) {
                Ok(img) => return Ok(Some(Frame::from_image(&img))),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping undecodable frame");
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_gray(dir: &Path, name: &str, value: u8) {
        let img = image::GrayImage::from_pixel(8, 8, image::Luma([value]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_open_missing_dir() {
        let result = ImageDirSource::open(Path::new("/nonexistent/frames"));
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_streams_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(dir.path(), "b.png", 20);
        write_gray(dir.path(), "a.png", 10);

        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.data[0], 10);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.data[0], 20);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_skips_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"not an image").unwrap();
        write_gray(dir.path(), "b.png", 42);

        let mut source = ImageDirSource::open(dir.path()).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.data[0], 42);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_ignores_non_image_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert_eq!(source.remaining(), 0);
        assert!(source.next_frame().unwrap().is_none());
    }
}
