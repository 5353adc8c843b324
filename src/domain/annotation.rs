//! Annotation object model
//!
//! Every user-created shape is an [`AnnotationObject`]: a placement (position,
//! rotation, non-uniform scale) plus one [`ObjectKind`] variant holding the
//! variant-specific geometry. Local geometry is expressed relative to the
//! placement origin; [`Placement::apply`] maps it into scene space.
//!
//! The two fixed layers (background fill and source image) are not
//! annotation objects and never appear here.

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect, Size};
use super::style::{Color, RedactStyle, ShapeStyle, TextStyle};

/// Scene-unique object identifier
pub type ObjectId = u64;

/// Line height multiplier used for text layout
pub const TEXT_LINE_HEIGHT: f32 = 1.16;
/// Approximate glyph advance relative to font size, used for text bounds
pub const TEXT_CHAR_WIDTH: f32 = 0.6;
/// Extra slack around stroked outlines when hit-testing, in scene pixels
pub const HIT_TOLERANCE: f32 = 4.0;

/// Position, rotation and scale of an object's local origin
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub left: f32,
    pub top: f32,
    /// Rotation in degrees, clockwise
    pub angle: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Placement {
    /// Unrotated, unscaled placement at `p`
    pub fn at(p: Point) -> Self {
        Self {
            left: p.x,
            top: p.y,
            ..Self::default()
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Map a local point to the parent coordinate space: scale, rotate, translate
    pub fn apply(&self, local: Point) -> Point {
        let scaled = Point::new(local.x * self.scale_x, local.y * self.scale_y);
        scaled.rotate(self.angle) + self.origin()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    pub width: f32,
    pub height: f32,
    pub style: ShapeStyle,
}

/// Ellipse whose bounding box starts at the placement origin
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EllipseShape {
    pub rx: f32,
    pub ry: f32,
    pub style: ShapeStyle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineShape {
    pub start: Point,
    pub end: Point,
    pub style: ShapeStyle,
}

/// Isosceles triangle centered on the placement origin, apex pointing up
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriangleShape {
    pub width: f32,
    pub height: f32,
    pub fill: Color,
}

impl TriangleShape {
    /// Apex, bottom-right, bottom-left in local coordinates
    pub fn vertices(&self) -> [Point; 3] {
        let (hw, hh) = (self.width * 0.5, self.height * 0.5);
        [
            Point::new(0.0, -hh),
            Point::new(hw, hh),
            Point::new(-hw, hh),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextShape {
    pub content: String,
    pub style: TextStyle,
}

impl TextShape {
    /// Approximate layout box used for hit-testing and selection bounds
    pub fn layout_size(&self) -> Size {
        let lines: Vec<&str> = self.content.split('\n').collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        Size::new(
            longest as f32 * self.style.font_size * TEXT_CHAR_WIDTH,
            lines.len() as f32 * self.style.font_size * TEXT_LINE_HEIGHT,
        )
    }
}

/// Composite of child objects placed relative to the group origin
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub children: Vec<AnnotationObject>,
}

/// Pixelated patch of the source image
///
/// Only `original_bounds`, `block_size` and `style` are durable. The patch
/// raster is derived from the live source image and regenerated whenever the
/// object is (re)created, so it is never serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlurRegion {
    /// Rectangle the user drew, in scene space, before cropping to the image
    pub original_bounds: Rect,
    pub block_size: u32,
    #[serde(default)]
    pub style: RedactStyle,
    #[serde(skip)]
    pub patch: Option<Arc<RgbaImage>>,
}

impl BlurRegion {
    pub fn new(original_bounds: Rect, block_size: u32, style: RedactStyle) -> Self {
        Self {
            original_bounds,
            block_size,
            style,
            patch: None,
        }
    }

    pub fn patch_size(&self) -> Size {
        self.patch
            .as_ref()
            .map(|p| Size::new(p.width() as f32, p.height() as f32))
            .unwrap_or_default()
    }
}

/// Variant-specific geometry of an annotation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectKind {
    Rect(RectShape),
    Ellipse(EllipseShape),
    Line(LineShape),
    /// Only used as an arrow head so far
    Triangle(TriangleShape),
    Text(TextShape),
    /// Fixed two-child group: a centered line followed by a triangular head
    Arrow(Group),
    Group(Group),
    Blur(BlurRegion),
}

/// A user-created annotation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationObject {
    pub id: ObjectId,
    pub placement: Placement,
    pub kind: ObjectKind,
    /// Selectable/movable flag, derived from the active tool and re-applied on
    /// every tool change
    #[serde(skip)]
    pub interactive: bool,
}

impl AnnotationObject {
    pub fn new(id: ObjectId, placement: Placement, kind: ObjectKind) -> Self {
        Self {
            id,
            placement,
            kind,
            interactive: false,
        }
    }

    /// Short name of the variant, used in logs
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Rect(_) => "rect",
            ObjectKind::Ellipse(_) => "ellipse",
            ObjectKind::Line(_) => "line",
            ObjectKind::Triangle(_) => "triangle",
            ObjectKind::Text(_) => "text",
            ObjectKind::Arrow(_) => "arrow",
            ObjectKind::Group(_) => "group",
            ObjectKind::Blur(_) => "blur",
        }
    }

    /// Child objects of composite variants
    pub fn children(&self) -> &[AnnotationObject] {
        match &self.kind {
            ObjectKind::Arrow(group) | ObjectKind::Group(group) => &group.children,
            _ => &[],
        }
    }

    /// Bounding box in local coordinates (before placement)
    pub fn local_bounds(&self) -> Rect {
        match &self.kind {
            ObjectKind::Rect(r) => Rect::new(0.0, 0.0, r.width, r.height),
            ObjectKind::Ellipse(e) => Rect::new(0.0, 0.0, e.rx * 2.0, e.ry * 2.0),
            ObjectKind::Line(l) => Rect::from_corners(l.start, l.end),
            ObjectKind::Triangle(t) => {
                Rect::new(-t.width * 0.5, -t.height * 0.5, t.width, t.height)
            }
            ObjectKind::Text(t) => {
                let size = t.layout_size();
                Rect::new(0.0, 0.0, size.width, size.height)
            }
            ObjectKind::Arrow(group) | ObjectKind::Group(group) => group
                .children
                .iter()
                .map(AnnotationObject::bounds)
                .reduce(|a, b| a.union(b))
                .unwrap_or_default(),
            ObjectKind::Blur(blur) => {
                let size = blur.patch_size();
                Rect::new(0.0, 0.0, size.width, size.height)
            }
        }
    }

    /// Axis-aligned bounding box in the parent coordinate space
    pub fn bounds(&self) -> Rect {
        let local = self.local_bounds();
        Rect::enclosing(local.corners().map(|c| self.placement.apply(c))).unwrap_or_default()
    }

    /// Widest stroke drawn by this object or its children
    pub fn stroke_width(&self) -> f32 {
        match &self.kind {
            ObjectKind::Rect(RectShape { style, .. })
            | ObjectKind::Ellipse(EllipseShape { style, .. })
            | ObjectKind::Line(LineShape { style, .. }) => style.stroke_width,
            ObjectKind::Arrow(group) | ObjectKind::Group(group) => group
                .children
                .iter()
                .map(AnnotationObject::stroke_width)
                .fold(0.0, f32::max),
            _ => 0.0,
        }
    }

    /// Area that counts as a click on the object
    ///
    /// Stroked shapes extend past their geometric bounds by half the stroke
    /// plus [`HIT_TOLERANCE`], so thin horizontal or vertical lines stay
    /// reachable.
    pub fn hit_bounds(&self) -> Rect {
        let stroke = self.stroke_width();
        if stroke > 0.0 {
            self.bounds().inflate(stroke * 0.5 + HIT_TOLERANCE)
        } else {
            self.bounds()
        }
    }

    /// Move the object by `(dx, dy)`
    ///
    /// Blur regions also shift their original bounds so the patch is
    /// re-derived at the new location; the caller regenerates the raster.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.placement.left += dx;
        self.placement.top += dy;
        if let ObjectKind::Blur(blur) = &mut self.kind {
            blur.original_bounds = blur.original_bounds.translate(dx, dy);
        }
    }

    /// Visit this object and every nested child, depth-first
    pub fn walk(&self, f: &mut impl FnMut(&AnnotationObject)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Mutable counterpart of [`walk`](Self::walk)
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut AnnotationObject)) {
        f(self);
        if let ObjectKind::Arrow(group) | ObjectKind::Group(group) = &mut self.kind {
            for child in &mut group.children {
                child.walk_mut(f);
            }
        }
    }

    /// Largest id used by this object or any of its children
    pub fn max_id(&self) -> ObjectId {
        let mut max = self.id;
        self.walk(&mut |o| max = max.max(o.id));
        max
    }

    pub fn is_blur(&self) -> bool {
        matches!(self.kind, ObjectKind::Blur(_))
    }
}

/// Durable, serializable form of an [`AnnotationObject`]
///
/// Derived state (blur rasters, interactivity) is stripped on capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectSnapshot(AnnotationObject);

impl ObjectSnapshot {
    pub fn capture(object: &AnnotationObject) -> Self {
        let mut object = object.clone();
        object.walk_mut(&mut |o| {
            o.interactive = false;
            if let ObjectKind::Blur(blur) = &mut o.kind {
                blur.patch = None;
            }
        });
        Self(object)
    }

    /// Live object without derived state; blur patches still need regenerating
    pub fn to_object(&self) -> AnnotationObject {
        self.0.clone()
    }
}
