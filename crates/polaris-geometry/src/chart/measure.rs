//! Text measurement for label layout.
//!
//! Shaping lives downstream of this crate, so label factories take a measurer
//! to estimate label extents before anything is drawn.

use polaris_core::math::Vec2;

/// Returns the size of `text` set at `font_size`, without padding.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font_size: f32) -> Vec2;
}

/// Assumes an average glyph width of 0.6em and a line height of 1em.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, font_size: f32) -> Vec2 {
        let width = 0.6 * font_size * text.chars().count() as f32;
        Vec2::new(width, font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_scales_with_length() {
        let m = HeuristicTextMeasurer;
        assert_eq!(m.measure("", 10.0), Vec2::new(0.0, 10.0));
        assert_eq!(m.measure("abcd", 10.0), Vec2::new(24.0, 10.0));
    }
}
