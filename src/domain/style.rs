//! Stroke, fill and text styling for annotations

use std::fmt;

use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA color
///
/// Serialized as a CSS hex string so config files stay readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS color value
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` with `a` in `0..=1`, and `transparent`.
    pub fn parse(input: &str) -> Option<Color> {
        let s = input.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Some(Color::TRANSPARENT);
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        let (args, has_alpha) = if let Some(rest) = lower.strip_prefix("rgba(") {
            (rest.strip_suffix(')')?, true)
        } else if let Some(rest) = lower.strip_prefix("rgb(") {
            (rest.strip_suffix(')')?, false)
        } else {
            return None;
        };

        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let expected = if has_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return None;
        }
        let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
        let r = channel(parts[0])?;
        let g = channel(parts[1])?;
        let b = channel(parts[2])?;
        let a = if has_alpha {
            let alpha = parts[3].parse::<f32>().ok()?;
            (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
        } else {
            255
        };
        Some(Color::rgba(r, g, b, a))
    }

    /// Convert to image crate RGBA format
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Same color with the alpha channel multiplied by `factor`
    pub fn with_alpha_factor(self, factor: f32) -> Color {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Color { a, ..self }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl Default for Color {
    fn default() -> Self {
        // Red used by the toolbar's first swatch
        Color::rgb(0xff, 0x3b, 0x30)
    }
}

/// Outline style of rectangles, ellipses and lines
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub stroke: Color,
    pub stroke_width: f32,
    /// Interior fill, `None` for outline-only shapes
    #[serde(default)]
    pub fill: Option<Color>,
    /// Dash pattern `[on, off]` in scene pixels
    #[serde(default)]
    pub dash: Option<[f32; 2]>,
}

impl ShapeStyle {
    pub fn outline(stroke: Color, stroke_width: f32) -> Self {
        Self {
            stroke,
            stroke_width,
            fill: None,
            dash: None,
        }
    }
}

/// Text color and size
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub color: Color,
    pub font_size: f32,
}

/// How a blur region obscures the pixels underneath
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactStyle {
    /// Each block becomes the average of its pixels
    #[default]
    Pixelate,
    /// Each block becomes a copy of its top-left pixel
    Sample,
}
