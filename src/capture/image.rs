//! Source image type for the screenshot being annotated

use std::sync::Arc;

use image::RgbaImage;

use crate::domain::Size;

/// The immutable decoded screenshot
///
/// Cloning is cheap; the pixel buffer is shared.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceImage {
    rgba: Arc<RgbaImage>,
}

impl SourceImage {
    /// Wrap an already decoded raster
    pub fn new(rgba: RgbaImage) -> Self {
        log::debug!("SourceImage attached: {}x{} pixels", rgba.width(), rgba.height());
        Self {
            rgba: Arc::new(rgba),
        }
    }

    /// Zero-sized placeholder used until the real image has been decoded
    pub fn empty() -> Self {
        Self {
            rgba: Arc::new(RgbaImage::new(0, 0)),
        }
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    /// Get the width of the image
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    /// Get the height of the image
    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    /// Intrinsic size in scene pixels
    pub fn size(&self) -> Size {
        Size::new(self.width() as f32, self.height() as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl Default for SourceImage {
    fn default() -> Self {
        Self::empty()
    }
}
