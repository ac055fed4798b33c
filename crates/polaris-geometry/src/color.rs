use serde::{Deserialize, Serialize};

/// An RGBA color with `f32` components in the `0.0..=1.0` range.
///
/// ```
/// use polaris_geometry::Color;
///
/// let red = Color::rgb(1.0, 0.0, 0.0);
/// let from_hex = Color::from_hex(0xC1C1C1);
/// let translucent = from_hex.with_alpha(0.3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Create a color from RGB components with full opacity (alpha = 1.0).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA components.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit RGBA values (0–255 mapped to 0.0–1.0).
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Create a color from a 24-bit RGB hex value (e.g. `0xFF8800`).
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as u8;
        let g = ((hex >> 8) & 0xFF) as u8;
        let b = (hex & 0xFF) as u8;
        Self::from_rgba_u8(r, g, b, 255)
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Area fill: nothing, or a solid colour.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    #[default]
    None,
    Solid(Color),
}

impl Fill {
    pub fn color(&self) -> Option<Color> {
        match self {
            Fill::None => None,
            Fill::Solid(color) => Some(*color),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Fill::None)
    }
}

impl From<Color> for Fill {
    fn from(color: Color) -> Self {
        Fill::Solid(color)
    }
}

impl From<Option<Color>> for Fill {
    fn from(color: Option<Color>) -> Self {
        color.map_or(Fill::None, Fill::Solid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_components() {
        let c = Color::from_hex(0xF5F5F5);
        assert!((c.r - 245.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
        assert_eq!(c.with_alpha(0.3).a, 0.3);
    }

    #[test]
    fn test_fill_color() {
        assert_eq!(Fill::None.color(), None);
        assert_eq!(Fill::from(Color::WHITE).color(), Some(Color::WHITE));
        assert!(Fill::from(None).is_none());
    }
}
