//! The annotation scene: source image, page layout and ordered objects
//!
//! The two fixed layers (background fill, then source image) always sit
//! behind every annotation and are not part of [`Scene::objects`].

use std::sync::Arc;

use crate::capture::image::SourceImage;
use crate::domain::{
    AnnotationObject, BlurRegion, ObjectId, ObjectKind, ObjectSnapshot, Padding, Placement, Point,
    Rect, RedactStyle, Size,
};
use crate::render::gradient::ResolvedFill;
use crate::render::pixelate;

/// Anything that can be addressed in the scene, including the fixed layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneItem {
    Background,
    Image,
    Object(ObjectId),
}

/// Rounded rectangle used as a clip region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedClip {
    pub rect: Rect,
    pub radius: f32,
}

/// Fill covering the whole canvas extent
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundLayer {
    pub fill: ResolvedFill,
    pub size: Size,
}

/// The source image placed inside the padding
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    pub position: Point,
    /// Present only when the corner radius is positive
    pub clip: Option<RoundedClip>,
}

#[derive(Debug)]
pub struct Scene {
    source: SourceImage,
    padding: Padding,
    background: String,
    corner_radius: f32,
    background_layer: BackgroundLayer,
    image_layer: ImageLayer,
    objects: Vec<AnnotationObject>,
    next_id: ObjectId,
}

impl Scene {
    pub fn new(source: SourceImage, padding: Padding, background: String, corner_radius: f32) -> Self {
        let mut scene = Self {
            source,
            padding,
            background,
            corner_radius: corner_radius.max(0.0),
            background_layer: BackgroundLayer {
                fill: ResolvedFill::Flat(String::new()),
                size: Size::default(),
            },
            image_layer: ImageLayer {
                position: Point::default(),
                clip: None,
            },
            objects: Vec::new(),
            next_id: 1,
        };
        scene.update_layout();
        scene
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    /// Canvas extent: source size plus padding on each axis
    pub fn extent(&self) -> Size {
        let image = self.source.size();
        Size::new(
            image.width + self.padding.horizontal(),
            image.height + self.padding.vertical(),
        )
    }

    /// Recompute the fixed layers after a padding, fill or radius change
    pub fn update_layout(&mut self) {
        let extent = self.extent();
        self.image_layer.position = self.padding.image_offset();
        self.background_layer = BackgroundLayer {
            fill: ResolvedFill::resolve(&self.background, extent.width, extent.height),
            size: extent,
        };
        self.image_layer.clip = (self.corner_radius > 0.0).then(|| RoundedClip {
            rect: Rect::new(
                self.image_layer.position.x,
                self.image_layer.position.y,
                self.source.size().width,
                self.source.size().height,
            ),
            radius: self.corner_radius,
        });
        log::debug!(
            "Layout updated: extent {}x{}, radius {}",
            extent.width,
            extent.height,
            self.corner_radius
        );
    }

    pub fn set_padding(&mut self, padding: Padding) {
        self.padding = padding;
        self.update_layout();
    }

    pub fn set_background(&mut self, descriptor: impl Into<String>) {
        self.background = descriptor.into();
        self.update_layout();
    }

    pub fn set_corner_radius(&mut self, radius: f32) {
        self.corner_radius = radius.max(0.0);
        self.update_layout();
    }

    /// Replace the source image and re-derive every blur patch from it
    pub fn set_source(&mut self, source: SourceImage) {
        self.source = source;
        self.update_layout();
        let frame = self.source.clone();
        let offset = self.padding.image_offset();
        self.objects
            .retain_mut(|object| regenerate_blur(object, &frame, offset));
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn corner_radius(&self) -> f32 {
        self.corner_radius
    }

    pub fn background_layer(&self) -> &BackgroundLayer {
        &self.background_layer
    }

    pub fn image_layer(&self) -> &ImageLayer {
        &self.image_layer
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    pub fn allocate_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append an object on top of the stack
    pub fn add(&mut self, object: AnnotationObject) -> ObjectId {
        let id = object.id;
        log::debug!("Adding {} {id}", object.kind_name());
        self.next_id = self.next_id.max(object.max_id() + 1);
        self.objects.push(object);
        id
    }

    /// Remove an item; the fixed layers are never removed
    pub fn remove(&mut self, item: SceneItem) -> bool {
        match item {
            SceneItem::Background | SceneItem::Image => {
                log::debug!("Refusing to remove fixed layer {item:?}");
                false
            }
            SceneItem::Object(id) => {
                let before = self.objects.len();
                self.objects.retain(|o| o.id != id);
                self.objects.len() != before
            }
        }
    }

    pub fn clear_objects(&mut self) {
        self.objects.clear();
    }

    pub fn objects(&self) -> &[AnnotationObject] {
        &self.objects
    }

    pub fn get(&self, id: ObjectId) -> Option<&AnnotationObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut AnnotationObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Apply the tool-derived interactivity flag to every object
    pub fn set_interactive(&mut self, interactive: bool) {
        for object in &mut self.objects {
            object.walk_mut(&mut |o| o.interactive = interactive);
        }
    }

    /// Topmost interactive object whose bounds contain `p`
    pub fn object_at(&self, p: Point) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.interactive && o.hit_bounds().contains_point(p))
            .map(|o| o.id)
    }

    /// Move an object, re-deriving blur patches at the new location
    ///
    /// A blur region moved off the image keeps its bounds but has no patch
    /// until it overlaps the image again.
    pub fn translate_object(&mut self, id: ObjectId, dx: f32, dy: f32) -> bool {
        let offset = self.padding.image_offset();
        let Some(object) = self.objects.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        object.translate(dx, dy);
        if object.is_blur() && !regenerate_blur(object, &self.source, offset) {
            log::debug!("Blur region {id} is off the image");
        }
        true
    }

    /// Remove top-level blur regions that no longer overlap the image
    pub fn discard_detached_blurs(&mut self) -> Vec<ObjectId> {
        let mut removed = Vec::new();
        self.objects.retain(|o| {
            let detached = matches!(&o.kind, ObjectKind::Blur(blur) if blur.patch.is_none());
            if detached {
                log::debug!("Discarding blur region {} left off the image", o.id);
                removed.push(o.id);
            }
            !detached
        });
        removed
    }

    /// Build a blur object for drawn `bounds`, or `None` if it misses the image
    pub fn create_blur(&mut self, bounds: Rect, block_size: u32, style: RedactStyle) -> Option<AnnotationObject> {
        let mut object = AnnotationObject::new(
            0,
            Placement::default(),
            ObjectKind::Blur(BlurRegion::new(bounds, block_size, style)),
        );
        if !regenerate_blur(&mut object, &self.source, self.padding.image_offset()) {
            log::debug!("Blur region {bounds:?} does not overlap the image");
            return None;
        }
        object.id = self.allocate_id();
        Some(object)
    }

    /// Replace every object with the contents of a history snapshot
    ///
    /// Objects are re-added in their original order; blur patches are
    /// regenerated from the current source image.
    pub fn reinstate(&mut self, snapshot: &[ObjectSnapshot]) {
        self.objects.clear();
        let offset = self.padding.image_offset();
        for snap in snapshot {
            let mut object = snap.to_object();
            if !regenerate_blur(&mut object, &self.source, offset) {
                log::debug!("Skipping blur {} that no longer overlaps the image", object.id);
                continue;
            }
            self.add(object);
        }
    }
}

/// Re-derive every blur patch inside `object` from the source image
///
/// Returns `false` when a top-level blur region no longer overlaps the image.
fn regenerate_blur(object: &mut AnnotationObject, source: &SourceImage, offset: Point) -> bool {
    let mut overlaps = true;
    let top_level = object.id;
    object.walk_mut(&mut |o| {
        let ObjectKind::Blur(blur) = &mut o.kind else {
            return;
        };
        match pixelate::composite(
            source.rgba(),
            offset,
            blur.original_bounds,
            blur.block_size,
            blur.style,
        ) {
            Some(patch) => {
                blur.patch = Some(Arc::new(patch.raster));
                o.placement.left = patch.position.x;
                o.placement.top = patch.position.y;
            }
            None => {
                blur.patch = None;
                o.placement.left = blur.original_bounds.left;
                o.placement.top = blur.original_bounds.top;
                if o.id == top_level {
                    overlaps = false;
                }
            }
        }
    });
    overlaps
}
