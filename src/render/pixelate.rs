//! Blur region compositing
//!
//! A blur region is drawn in scene (padded) space, cropped against the source
//! image and turned into a pixelated patch. The patch is always derived from
//! the live source image, the drawn bounds and the block size.

use image::{Rgba, RgbaImage};

use crate::domain::{Point, Rect, RedactStyle};

/// Regions narrower or shorter than this (in scene pixels) are discarded
pub const MIN_REGION_SIZE: f32 = 5.0;

/// Integer crop rectangle in source-image pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// A finished patch and where it goes in scene space
#[derive(Clone, Debug, PartialEq)]
pub struct BlurPatch {
    pub position: Point,
    pub crop: CropRect,
    pub raster: RgbaImage,
}

/// Whether a drawn region is below the minimum blur size in either dimension
pub fn is_too_small(bounds: Rect) -> bool {
    bounds.width < MIN_REGION_SIZE || bounds.height < MIN_REGION_SIZE
}

/// Translate scene-space `bounds` into source pixels and clip to the image
///
/// `offset` is the image origin in scene space (`padding.left`,
/// `padding.top`). Returns `None` when the region does not overlap the image.
pub fn crop_to_image(bounds: Rect, offset: Point, image_width: u32, image_height: u32) -> Option<CropRect> {
    let crop_left = (bounds.left - offset.x).max(0.0);
    let crop_top = (bounds.top - offset.y).max(0.0);
    let crop_right = (image_width as f32).min(bounds.left + bounds.width - offset.x);
    let crop_bottom = (image_height as f32).min(bounds.top + bounds.height - offset.y);

    let crop_width = crop_right - crop_left;
    let crop_height = crop_bottom - crop_top;
    if crop_width <= 0.0 || crop_height <= 0.0 {
        return None;
    }

    let left = crop_left.floor() as u32;
    let top = crop_top.floor() as u32;
    let right = (crop_right.ceil() as u32).min(image_width);
    let bottom = (crop_bottom.ceil() as u32).min(image_height);
    if right <= left || bottom <= top {
        return None;
    }

    Some(CropRect {
        left,
        top,
        width: right - left,
        height: bottom - top,
    })
}

/// Produce the pixelated patch for a drawn region
///
/// Returns `None` (no object) when the region misses the image entirely.
pub fn composite(
    source: &RgbaImage,
    offset: Point,
    bounds: Rect,
    block_size: u32,
    style: RedactStyle,
) -> Option<BlurPatch> {
    let crop = crop_to_image(bounds, offset, source.width(), source.height())?;
    let mut raster =
        image::imageops::crop_imm(source, crop.left, crop.top, crop.width, crop.height).to_image();
    pixelate(&mut raster, block_size, style);

    Some(BlurPatch {
        position: Point::new(offset.x + crop.left as f32, offset.y + crop.top as f32),
        crop,
        raster,
    })
}

/// Replace every `block_size` x `block_size` cell with a single color
pub fn pixelate(img: &mut RgbaImage, block_size: u32, style: RedactStyle) {
    let block_size = block_size.max(1);
    if img.width() == 0 || img.height() == 0 || block_size == 1 {
        return;
    }
    let max_x = img.width() - 1;
    let max_y = img.height() - 1;

    let mut block_y = 0;
    while block_y <= max_y {
        let block_end_y = (block_y + block_size - 1).min(max_y);

        let mut block_x = 0;
        while block_x <= max_x {
            let block_end_x = (block_x + block_size - 1).min(max_x);

            let color = match style {
                RedactStyle::Pixelate => {
                    average_block(img, block_x, block_y, block_end_x, block_end_y)
                }
                RedactStyle::Sample => *img.get_pixel(block_x, block_y),
            };

            for py in block_y..=block_end_y {
                for px in block_x..=block_end_x {
                    img.put_pixel(px, py, color);
                }
            }

            block_x += block_size;
        }
        block_y += block_size;
    }
}

fn average_block(img: &RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32) -> Rgba<u8> {
    let mut total = [0u64; 4];
    let mut pixel_count: u64 = 0;

    for py in y0..=y1 {
        for px in x0..=x1 {
            let pixel = img.get_pixel(px, py);
            for (sum, channel) in total.iter_mut().zip(pixel.0) {
                *sum += channel as u64;
            }
            pixel_count += 1;
        }
    }

    Rgba(total.map(|sum| (sum / pixel_count.max(1)) as u8))
}
