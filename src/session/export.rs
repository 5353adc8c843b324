//! Flattened raster export

use std::io;

use anyhow::Context;
use chrono::{DateTime, TimeZone};
use image::RgbaImage;

use crate::domain::Rect;
use crate::render::image::RenderSurface;
use crate::session::scene::{RoundedClip, Scene};

/// Rasterize the scene at zoom 1 over its full extent
///
/// The surface's zoom, size and clip are restored afterwards, whether or not
/// rasterization succeeded. When the scene has a corner radius the whole
/// extent is clipped so the exported corners are transparent.
pub fn export_scene(scene: &Scene, surface: &mut dyn RenderSurface) -> anyhow::Result<RgbaImage> {
    let prior_zoom = surface.zoom();
    let prior_dimensions = surface.dimensions();
    let prior_clip = surface.clip();

    let extent = scene.extent();
    surface.set_zoom(1.0);
    surface.set_dimensions(extent.width.round() as u32, extent.height.round() as u32);
    if scene.corner_radius() > 0.0 {
        surface.set_clip(Some(RoundedClip {
            rect: Rect::new(0.0, 0.0, extent.width, extent.height),
            radius: scene.corner_radius(),
        }));
    }

    let result = surface.rasterize(scene);

    surface.set_clip(prior_clip);
    surface.set_zoom(prior_zoom);
    surface.set_dimensions(prior_dimensions.0, prior_dimensions.1);

    let image = result.context("Failed to rasterize scene for export")?;
    log::debug!("Exported {}x{} image", image.width(), image.height());
    Ok(image)
}

/// Encode an exported raster as lossless RGBA PNG
pub fn encode_png(image: &RgbaImage) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_png(&mut bytes, image).context("Failed to encode PNG")?;
    Ok(bytes)
}

fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

/// File name for an export taken at `timestamp`, e.g. `Snipp 24-03-05 at 14.07.09.png`
pub fn export_filename<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Snipp {}.png", timestamp.format("%y-%m-%d at %H.%M.%S"))
}
