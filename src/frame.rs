//! Fixed-resolution RGB24 frame buffer
//!
//! All readers normalize their output to this format so the rest of the
//! pipeline never cares where a frame came from.

use image::RgbImage;

/// One decoded video frame, tightly packed RGB24
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, `width * height * 3` bytes, row-major RGB
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame from a raw RGB24 buffer
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != Self::byte_len(width, height) {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Byte length of a raw RGB24 frame at the given resolution
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Convert to an owned `RgbImage` for drawing
    pub fn to_image(&self) -> RgbImage {
        // Length is validated at construction, from_raw cannot fail here
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Build a frame from an `RgbImage`
    pub fn from_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}
