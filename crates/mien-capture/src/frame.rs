//! Frame type — single-channel image data as produced by a frame source.

/// A single-channel (grayscale) frame.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes, row-major).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Build a frame from raw grayscale bytes.
    ///
    /// Returns `None` when the buffer length does not match the dimensions.
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// Convert a decoded image to a grayscale frame.
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let luma = img.to_luma8();
        let (width, height) = luma.dimensions();
        Self {
            data: luma.into_raw(),
            width,
            height,
        }
    }

    /// Average pixel brightness (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
