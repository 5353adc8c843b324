//! Linear gradient resolution for the background fill
//!
//! Background descriptors use the CSS form
//! `linear-gradient(<angle>deg, <color> 0%, <color> 100%)`. Anything else is
//! treated as a flat fill value.

use crate::domain::{Color, Point};

/// One color stop, `offset` in `0.0..=1.0`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// Two-stop linear gradient in absolute surface coordinates
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: [GradientStop; 2],
}

/// A background descriptor resolved against a surface size
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedFill {
    Gradient(LinearGradient),
    /// Opaque fill value, interpreted by the renderer as a CSS color
    Flat(String),
}

impl ResolvedFill {
    /// Resolve `descriptor` for a surface of `width` x `height`
    pub fn resolve(descriptor: &str, width: f32, height: f32) -> ResolvedFill {
        match parse_linear_gradient(descriptor, width, height) {
            Some(gradient) => ResolvedFill::Gradient(gradient),
            None => ResolvedFill::Flat(descriptor.trim().to_string()),
        }
    }
}

/// Parse a two-stop linear gradient and convert it to device coordinates
///
/// Returns `None` when the descriptor is not exactly
/// `linear-gradient(<n>deg, <color> 0%, <color> 100%)`.
pub fn parse_linear_gradient(descriptor: &str, width: f32, height: f32) -> Option<LinearGradient> {
    let body = descriptor
        .trim()
        .strip_prefix("linear-gradient(")?
        .strip_suffix(')')?;

    let parts = split_top_level(body);
    let [angle, first, second] = parts.as_slice() else {
        return None;
    };

    let angle: f32 = angle.trim().strip_suffix("deg")?.trim().parse().ok()?;
    let first = parse_stop(first, 0.0)?;
    let second = parse_stop(second, 1.0)?;

    let (start, end) = gradient_line(angle, width, height);
    Some(LinearGradient {
        start,
        end,
        stops: [first, second],
    })
}

/// Start and end points of a gradient at `angle` degrees over a surface
pub fn gradient_line(angle: f32, width: f32, height: f32) -> (Point, Point) {
    let (sin, cos) = (angle - 90.0).to_radians().sin_cos();
    let start = Point::new((0.5 - cos * 0.5) * width, (0.5 - sin * 0.5) * height);
    let end = Point::new((0.5 + cos * 0.5) * width, (0.5 + sin * 0.5) * height);
    (start, end)
}

/// Parse `<color> <offset>%`, requiring the offset to equal `expected`
fn parse_stop(stop: &str, expected: f32) -> Option<GradientStop> {
    let (color, offset) = stop.trim().rsplit_once(char::is_whitespace)?;
    let offset: f32 = offset.strip_suffix('%')?.parse().ok()?;
    if (offset / 100.0 - expected).abs() > f32::EPSILON {
        return None;
    }
    Some(GradientStop {
        offset: expected,
        color: Color::parse(color)?,
    })
}

/// Split on commas that are not nested inside parentheses
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
