//! Stroke properties for lines and outlines.

use serde::{Deserialize, Serialize};

use crate::Color;

/// Line cap style for stroke endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    /// Flat cap ending at the endpoint.
    #[default]
    Butt,
    /// Round cap extending beyond the endpoint.
    Round,
    /// Square cap extending beyond the endpoint.
    Square,
}

/// Line join style for stroke corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    /// Miter join (sharp corner).
    #[default]
    Miter,
    /// Round join (rounded corner).
    Round,
    /// Bevel join (flat corner).
    Bevel,
}

/// Stroke properties for paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stroke {
    /// Stroke color
    pub color: Color,
    /// Stroke width in logical pixels
    pub thickness: f32,
    /// Line cap style
    pub line_cap: LineCap,
    /// Line join style
    pub line_join: LineJoin,
    /// Opacity multiplier (0.0 to 1.0)
    pub opacity: f32,
}

impl Stroke {
    /// Create a solid color stroke.
    pub fn solid(color: Color, thickness: f32) -> Self {
        Self {
            color,
            thickness,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            opacity: 1.0,
        }
    }

    /// Set the line cap style.
    pub fn with_line_cap(mut self, cap: LineCap) -> Self {
        self.line_cap = cap;
        self
    }

    /// Set the line join style.
    pub fn with_line_join(mut self, join: LineJoin) -> Self {
        self.line_join = join;
        self
    }

    /// Set the opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Thickness used for layout. A zero or invalid width counts as one pixel.
    pub fn layout_thickness(&self) -> f32 {
        if self.thickness.is_finite() && self.thickness > 0.0 {
            self.thickness
        } else {
            1.0
        }
    }

    /// Check if the stroke is visible.
    pub fn is_visible(&self) -> bool {
        self.thickness > 0.0 && self.opacity > 0.0
    }
}

impl Default for Stroke {
    fn default() -> Self {
        Self::solid(Color::BLACK, 1.0)
    }
}
