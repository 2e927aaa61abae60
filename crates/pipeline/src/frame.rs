//! Decoded video frames.

use std::fmt;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageResult, RgbImage};

/// JPEG quality for stored frames and classifier payloads.
pub const JPEG_QUALITY: u8 = 90;

/// An immutable RGB24 raster.
///
/// Cloning is cheap: the pixels are reference counted, so the ring buffer
/// and a candidate can hold the same frame.
#[derive(Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
}

impl Frame {
    /// Wrap raw RGB24 bytes. Returns `None` if `data` holds fewer than
    /// `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::from_image)
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::from_image(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Raw pixel bytes, row-major RGB24.
    pub fn as_rgb(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Encode as a baseline JPEG.
    pub fn to_jpeg(&self) -> ImageResult<Vec<u8>> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode(
            self.as_rgb(),
            self.width(),
            self.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(out)
    }

    /// Whether both handles point at the same decoded pixels.
    pub fn ptr_eq(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
