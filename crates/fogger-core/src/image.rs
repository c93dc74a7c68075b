//! Owned RGBA8 image buffer.

use crate::{Error, Result};

/// Number of channels per pixel. The blur pipeline works on interleaved
/// RGBA8 data exclusively.
pub const CHANNELS: usize = 4;

/// Owned image buffer: interleaved RGBA8 pixels in row-major order.
///
/// The buffer length is always `width * height * 4`; constructors reject
/// anything else, so downstream code can index without re-validating.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    /// Raw pixel data (RGBA, 4 bytes per pixel).
    data: Vec<u8>,
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
}

impl Image {
    /// Create an image filled with transparent black.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let size = (width as usize) * (height as usize) * CHANNELS;
        Ok(Self {
            data: vec![0; size],
            width,
            height,
        })
    }

    /// Create an image from an existing RGBA8 buffer.
    pub fn from_rgba8(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let expected = (width as usize) * (height as usize) * CHANNELS;
        if data.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Fill every pixel with the given RGBA color.
    pub fn fill(&mut self, pixel: [u8; CHANNELS]) {
        for px in self.data.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&pixel);
        }
    }

    /// Get pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable pixel data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Image dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Read the pixel at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is outside the image, like slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; CHANNELS] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{} image",
            self.width,
            self.height
        );
        let base = ((y as usize) * (self.width as usize) + (x as usize)) * CHANNELS;
        [
            self.data[base],
            self.data[base + 1],
            self.data[base + 2],
            self.data[base + 3],
        ]
    }

    /// Copy this image into a new, independently owned buffer.
    pub fn duplicate(&self) -> Self {
        Self {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let img = Image::new(4, 3).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.size_bytes(), 4 * 3 * CHANNELS);
        assert!(img.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(Image::new(0, 4).is_err());
        assert!(Image::from_rgba8(vec![], 4, 0).is_err());
    }

    #[test]
    fn test_from_rgba8_length_check() {
        let err = Image::from_rgba8(vec![0; 10], 2, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferSizeMismatch {
                expected: 16,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_fill_and_pixel() {
        let mut img = Image::new(2, 2).unwrap();
        img.fill([10, 20, 30, 255]);
        assert_eq!(img.pixel(1, 1), [10, 20, 30, 255]);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut img = Image::new(2, 1).unwrap();
        img.fill([5, 5, 5, 255]);
        let copy = img.duplicate();
        img.fill([9, 9, 9, 255]);
        assert_eq!(copy.pixel(0, 0), [5, 5, 5, 255]);
        assert_eq!(img.pixel(0, 0), [9, 9, 9, 255]);
    }

    #[test]
    #[should_panic]
    fn test_pixel_out_of_bounds_panics() {
        let img = Image::new(2, 2).unwrap();
        let _ = img.pixel(2, 0);
    }
}
