//! Angle and pixel helpers.
//!
//! Angles are in degrees. Angle `0` points along +x and angles grow clockwise,
//! since screen `y` grows downwards.

pub use glam::Vec2;

/// Normalize an angle in degrees into `[0, 360)`.
///
/// Non-finite input yields `0`.
pub fn standard_angle(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let angle = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if angle >= 360.0 { 0.0 } else { angle }
}

/// Round half up, matching how the layout snaps to whole pixels.
///
/// `f32::round` rounds half away from zero, which would snap `-5.5` to `-6`.
pub fn pixel_round(value: f32) -> f32 {
    (value + 0.5).floor()
}

/// Point at `radius` from `center` in direction `degrees`.
pub fn point_on_circle(center: Vec2, radius: f32, degrees: f32) -> Vec2 {
    let rad = degrees.to_radians();
    Vec2::new(center.x + radius * rad.cos(), center.y + radius * rad.sin())
}

/// [`point_on_circle`] snapped to whole pixels.
pub fn pixel_point_on_circle(center: Vec2, radius: f32, degrees: f32) -> Vec2 {
    let p = point_on_circle(center, radius, degrees);
    Vec2::new(pixel_round(p.x), pixel_round(p.y))
}

/// Half-pixel shift that keeps odd-width lines crisp at axis-aligned angles.
///
/// Only exact multiples of 90 degrees are shifted.
pub fn axis_aligned_pixel_shift(degrees: f32, thickness: f32) -> Vec2 {
    let odd = thickness % 2.0 != 0.0;
    if !odd {
        return Vec2::ZERO;
    }
    if degrees == 0.0 {
        Vec2::new(0.0, -0.5)
    } else if degrees == 90.0 {
        Vec2::new(-0.5, 0.0)
    } else if degrees == 180.0 {
        Vec2::new(0.0, 0.5)
    } else if degrees == 270.0 {
        Vec2::new(0.5, 0.0)
    } else {
        Vec2::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_angle_range() {
        for input in [-720.5, -360.0, -90.0, -0.0001, 0.0, 45.0, 359.9, 360.0, 725.0] {
            let angle = standard_angle(input);
            assert!((0.0..360.0).contains(&angle), "{input} -> {angle}");
        }
        assert_eq!(standard_angle(-90.0), 270.0);
        assert_eq!(standard_angle(450.0), 90.0);
        assert_eq!(standard_angle(f32::NAN), 0.0);
    }

    #[test]
    fn test_pixel_round_half_up() {
        assert_eq!(pixel_round(205.5), 206.0);
        assert_eq!(pixel_round(-5.5), -5.0);
        assert_eq!(pixel_round(4.49), 4.0);
    }

    #[test]
    fn test_pixel_shift() {
        assert_eq!(axis_aligned_pixel_shift(0.0, 1.0), Vec2::new(0.0, -0.5));
        assert_eq!(axis_aligned_pixel_shift(270.0, 3.0), Vec2::new(0.5, 0.0));
        assert_eq!(axis_aligned_pixel_shift(90.0, 2.0), Vec2::ZERO);
        assert_eq!(axis_aligned_pixel_shift(45.0, 1.0), Vec2::ZERO);
    }
}
