//! Scene rasterization using tiny-skia
//!
//! [`SkiaSurface`] flattens a [`Scene`] (background, rounded source image and
//! every annotation) into an [`RgbaImage`] at the surface's zoom.

use std::path::Path;

use ab_glyph::{Font, FontArc, ScaleFont};
use anyhow::Context;
use image::RgbaImage;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, GradientStop, IntSize, LineCap, LineJoin, Mask, Paint,
    PathBuilder, Pixmap, PixmapPaint, SpreadMode, Stroke, StrokeDash, Transform,
};

use super::geometry::{self, shape};
use super::gradient::ResolvedFill;
use crate::domain::{
    AnnotationObject, Color, ObjectKind, Rect, ShapeStyle, TEXT_LINE_HEIGHT, TextShape,
};
use crate::session::scene::{RoundedClip, Scene};

/// Drawing target the editor resizes, zooms and clips
pub trait RenderSurface {
    /// Device size in pixels
    fn dimensions(&self) -> (u32, u32);
    fn set_dimensions(&mut self, width: u32, height: u32);
    fn zoom(&self) -> f32;
    fn set_zoom(&mut self, zoom: f32);
    /// Clip applied to the whole surface, in scene coordinates
    fn clip(&self) -> Option<RoundedClip>;
    fn set_clip(&mut self, clip: Option<RoundedClip>);
    /// Flatten the scene at the current size, zoom and clip
    fn rasterize(&self, scene: &Scene) -> anyhow::Result<RgbaImage>;
}

/// CPU rasterizer backed by tiny-skia
#[derive(Clone, Default)]
pub struct SkiaSurface {
    width: u32,
    height: u32,
    zoom: f32,
    clip: Option<RoundedClip>,
    font: Option<FontArc>,
}

impl std::fmt::Debug for SkiaSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkiaSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("zoom", &self.zoom)
            .field("clip", &self.clip)
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl SkiaSurface {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            ..Self::default()
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a TrueType/OpenType font used for text objects
    pub fn with_font_file(self, path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font file {}", path.display()))?;
        let font = FontArc::try_from_vec(data)
            .with_context(|| format!("Invalid font file {}", path.display()))?;
        log::debug!("Loaded text font from {}", path.display());
        Ok(self.with_font(font))
    }
}

impl RenderSurface for SkiaSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    fn clip(&self) -> Option<RoundedClip> {
        self.clip
    }

    fn set_clip(&mut self, clip: Option<RoundedClip>) {
        self.clip = clip;
    }

    fn rasterize(&self, scene: &Scene) -> anyhow::Result<RgbaImage> {
        let mut pixmap = Pixmap::new(self.width, self.height).with_context(|| {
            format!("Cannot rasterize onto a {}x{} surface", self.width, self.height)
        })?;
        let base = Transform::from_scale(self.zoom, self.zoom);

        draw_background(&mut pixmap, scene, base);
        draw_source(&mut pixmap, scene, base);
        for object in scene.objects() {
            self.draw_object(&mut pixmap, object, base);
        }

        if let Some(clip) = self.clip {
            let mut mask = Mask::new(self.width, self.height).context("Failed to allocate clip mask")?;
            if let Some(path) = rounded_rect_path(clip.rect, clip.radius) {
                mask.fill_path(&path, FillRule::Winding, true, base);
            }
            pixmap.apply_mask(&mask);
        }

        rgba_from_pixmap(&pixmap).context("Failed to convert rendered surface")
    }
}

impl SkiaSurface {
    fn draw_object(&self, pixmap: &mut Pixmap, object: &AnnotationObject, parent: Transform) {
        let p = &object.placement;
        let transform = parent
            .pre_translate(p.left, p.top)
            .pre_concat(Transform::from_rotate(p.angle))
            .pre_scale(p.scale_x, p.scale_y);

        match &object.kind {
            ObjectKind::Rect(rect) => {
                let Some(bounds) = tiny_skia::Rect::from_xywh(0.0, 0.0, rect.width, rect.height)
                else {
                    return;
                };
                draw_shape(pixmap, PathBuilder::from_rect(bounds), &rect.style, transform);
            }
            ObjectKind::Ellipse(ellipse) => {
                let (cx, cy, rx, ry) =
                    geometry::ellipse_from_bounds(0.0, 0.0, ellipse.rx * 2.0, ellipse.ry * 2.0);
                if let Some(path) = build_ellipse_path(cx, cy, rx, ry) {
                    draw_shape(pixmap, path, &ellipse.style, transform);
                }
            }
            ObjectKind::Line(line) => {
                let mut pb = PathBuilder::new();
                pb.move_to(line.start.x, line.start.y);
                pb.line_to(line.end.x, line.end.y);
                if let Some(path) = pb.finish() {
                    draw_shape(pixmap, path, &line.style, transform);
                }
            }
            ObjectKind::Triangle(triangle) => {
                let [apex, right, left] = triangle.vertices();
                let mut pb = PathBuilder::new();
                pb.move_to(apex.x, apex.y);
                pb.line_to(right.x, right.y);
                pb.line_to(left.x, left.y);
                pb.close();
                if let Some(path) = pb.finish() {
                    pixmap.fill_path(&path, &solid_paint(triangle.fill), FillRule::Winding, transform, None);
                }
            }
            ObjectKind::Text(text) => self.draw_text(pixmap, text, transform),
            ObjectKind::Arrow(group) | ObjectKind::Group(group) => {
                for child in &group.children {
                    self.draw_object(pixmap, child, transform);
                }
            }
            ObjectKind::Blur(blur) => {
                let Some(patch) = blur.patch.as_ref().and_then(|p| pixmap_from_rgba(p)) else {
                    log::debug!("Blur object {} has no patch to draw", object.id);
                    return;
                };
                let paint = PixmapPaint {
                    quality: FilterQuality::Nearest,
                    ..PixmapPaint::default()
                };
                pixmap.draw_pixmap(0, 0, patch.as_ref(), &paint, transform, None);
            }
        }
    }

    /// Render text into a glyph layer, then place the layer like an image
    fn draw_text(&self, pixmap: &mut Pixmap, text: &TextShape, transform: Transform) {
        let Some(font) = &self.font else {
            log::debug!("No font configured, skipping text {:?}", text.content);
            return;
        };
        let Some(layer) = glyph_layer(font, text) else {
            return;
        };
        pixmap.draw_pixmap(0, 0, layer.as_ref(), &PixmapPaint::default(), transform, None);
    }
}

fn draw_background(pixmap: &mut Pixmap, scene: &Scene, base: Transform) {
    let layer = scene.background_layer();
    let Some(bounds) = tiny_skia::Rect::from_xywh(0.0, 0.0, layer.size.width, layer.size.height)
    else {
        return;
    };

    let paint = match &layer.fill {
        ResolvedFill::Gradient(gradient) => {
            let stops = gradient
                .stops
                .iter()
                .map(|stop| GradientStop::new(stop.offset, skia_color(stop.color)))
                .collect();
            match tiny_skia::LinearGradient::new(
                tiny_skia::Point::from_xy(gradient.start.x, gradient.start.y),
                tiny_skia::Point::from_xy(gradient.end.x, gradient.end.y),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            ) {
                Some(shader) => Paint {
                    shader,
                    anti_alias: true,
                    ..Paint::default()
                },
                None => solid_paint(gradient.stops[0].color),
            }
        }
        ResolvedFill::Flat(value) => match Color::parse(value) {
            Some(color) => solid_paint(color),
            None => {
                log::warn!("Unrecognized background fill {value:?}, leaving it transparent");
                return;
            }
        },
    };
    pixmap.fill_rect(bounds, &paint, base, None);
}

fn draw_source(pixmap: &mut Pixmap, scene: &Scene, base: Transform) {
    let source = scene.source();
    if source.is_empty() {
        return;
    }
    let Some(image) = pixmap_from_rgba(source.rgba()) else {
        return;
    };
    let layer = scene.image_layer();

    let mask = layer.clip.and_then(|clip| {
        let mut mask = Mask::new(pixmap.width(), pixmap.height())?;
        let path = rounded_rect_path(clip.rect, clip.radius)?;
        mask.fill_path(&path, FillRule::Winding, true, base);
        Some(mask)
    });

    pixmap.draw_pixmap(
        0,
        0,
        image.as_ref(),
        &PixmapPaint::default(),
        base.pre_translate(layer.position.x, layer.position.y),
        mask.as_ref(),
    );
}

fn draw_shape(pixmap: &mut Pixmap, path: tiny_skia::Path, style: &ShapeStyle, transform: Transform) {
    if let Some(fill) = style.fill {
        pixmap.fill_path(&path, &solid_paint(fill), FillRule::Winding, transform, None);
    }
    if style.stroke_width <= 0.0 {
        return;
    }
    let stroke = Stroke {
        width: style.stroke_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        dash: style.dash.and_then(|[on, off]| StrokeDash::new(vec![on, off], 0.0)),
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &solid_paint(style.stroke), &stroke, transform, None);
}

fn solid_paint(color: Color) -> Paint<'static> {
    let [r, g, b, a] = color.to_rgba_u8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn skia_color(color: Color) -> tiny_skia::Color {
    let [r, g, b, a] = color.to_rgba_u8();
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

/// Build an ellipse path using cubic bezier curves
fn build_ellipse_path(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<tiny_skia::Path> {
    if rx <= 0.0 || ry <= 0.0 {
        return None;
    }
    let kx = rx * shape::BEZIER_K;
    let ky = ry * shape::BEZIER_K;

    let mut pb = PathBuilder::new();
    pb.move_to(cx, cy - ry);
    pb.cubic_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy);
    pb.cubic_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry);
    pb.cubic_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy);
    pb.cubic_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry);
    pb.close();
    pb.finish()
}

/// Rectangle with circular corners; the radius is capped at half the short side
fn rounded_rect_path(rect: Rect, radius: f32) -> Option<tiny_skia::Path> {
    let r = radius.min(rect.width * 0.5).min(rect.height * 0.5).max(0.0);
    let (x0, y0, x1, y1) = (rect.left, rect.top, rect.right(), rect.bottom());
    if r == 0.0 {
        return tiny_skia::Rect::from_ltrb(x0, y0, x1, y1).map(PathBuilder::from_rect);
    }
    let k = r * (1.0 - shape::BEZIER_K);

    let mut pb = PathBuilder::new();
    pb.move_to(x0 + r, y0);
    pb.line_to(x1 - r, y0);
    pb.cubic_to(x1 - k, y0, x1, y0 + k, x1, y0 + r);
    pb.line_to(x1, y1 - r);
    pb.cubic_to(x1, y1 - k, x1 - k, y1, x1 - r, y1);
    pb.line_to(x0 + r, y1);
    pb.cubic_to(x0 + k, y1, x0, y1 - k, x0, y1 - r);
    pb.line_to(x0, y0 + r);
    pb.cubic_to(x0, y0 + k, x0 + k, y0, x0 + r, y0);
    pb.close();
    pb.finish()
}

/// Rasterize text glyphs into a layer in the text object's local space
fn glyph_layer(font: &FontArc, text: &TextShape) -> Option<Pixmap> {
    let size = text.style.font_size;
    let scaled = font.as_scaled(size);
    let line_height = size * TEXT_LINE_HEIGHT;
    let lines: Vec<&str> = text.content.split('\n').collect();

    let line_width = |line: &str| {
        let mut width = 0.0;
        let mut prev = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    };
    let width = lines.iter().map(|&l| line_width(l)).fold(0.0f32, f32::max);
    let height = lines.len() as f32 * line_height;
    let mut layer = Pixmap::new(width.ceil() as u32 + 1, height.ceil() as u32 + 1)?;

    let [r, g, b, a] = text.style.color.to_rgba_u8();
    let (layer_w, layer_h) = (layer.width() as i32, layer.height() as i32);
    let data = layer.data_mut();

    for (row, line) in lines.iter().enumerate() {
        let baseline = row as f32 * line_height + scaled.ascent();
        let mut x = 0.0;
        let mut prev = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                x += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(size, ab_glyph::point(x, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let px = bounds.min.x as i32 + gx as i32;
                    let py = bounds.min.y as i32 + gy as i32;
                    if px < 0 || py < 0 || px >= layer_w || py >= layer_h {
                        return;
                    }
                    let alpha = (coverage.clamp(0.0, 1.0) * a as f32).round() as u8;
                    let i = (py * layer_w + px) as usize * 4;
                    if alpha <= data[i + 3] {
                        return;
                    }
                    let c = ColorU8::from_rgba(r, g, b, alpha).premultiply();
                    data[i..i + 4].copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
                });
            }
            x += scaled.h_advance(id);
            prev = Some(id);
        }
    }
    Some(layer)
}

/// Convert straight-alpha RGBA into a premultiplied pixmap
fn pixmap_from_rgba(img: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(img.width(), img.height())?;
    let data = img
        .pixels()
        .flat_map(|p| {
            let c = ColorU8::from_rgba(p[0], p[1], p[2], p[3]).premultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    Pixmap::from_vec(data, size)
}

/// Convert a premultiplied pixmap back into straight-alpha RGBA
fn rgba_from_pixmap(pixmap: &Pixmap) -> Option<RgbaImage> {
    let data = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
}
