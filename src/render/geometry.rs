//! Shared geometry calculations for annotations
//!
//! Constants and math shared between the tool state machine (which builds
//! objects) and the tiny-skia rasterizer (which draws them).

/// Arrow geometry constants
pub mod arrow {
    use crate::domain::Point;

    /// Arrow head side length in scene pixels
    pub const HEAD_LENGTH: f32 = 15.0;

    /// Rotation of the head triangle in degrees
    ///
    /// The triangle's apex points up at 0°, so a quarter turn is added to the
    /// shaft direction.
    pub fn head_angle(start: Point, end: Point) -> f32 {
        let dy = end.y - start.y;
        let dx = end.x - start.x;
        dy.atan2(dx).to_degrees() + 90.0
    }
}

/// Shape (rectangle/ellipse) geometry constants
pub mod shape {
    /// Ellipse bezier approximation constant: 4/3 * (sqrt(2) - 1)
    pub const BEZIER_K: f32 = 0.552_284_8;
}

/// Calculate ellipse center and radii from bounding box
#[inline]
pub fn ellipse_from_bounds(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> (f32, f32, f32, f32) {
    let cx = (min_x + max_x) * 0.5;
    let cy = (min_y + max_y) * 0.5;
    let rx = (max_x - min_x) * 0.5;
    let ry = (max_y - min_y) * 0.5;
    (cx, cy, rx, ry)
}
