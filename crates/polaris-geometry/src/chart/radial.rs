//! Radial layout and bounds fitting.
//!
//! A radial element places one tick per scale value around a circle, starting
//! at the top and going clockwise. Ticks and labels stick out of the circle,
//! so the naive radius of half the smaller side overflows the parent bounds.
//! [`fit_radial_layout`] finds the outermost point on each side and shrinks
//! the radius until everything fits.
//!
//! All angles are in degrees with `0` pointing right and growing clockwise;
//! see [`polaris_core::math`].

use polaris_core::Rect;
use polaris_core::math::{Vec2, pixel_point_on_circle, pixel_round, standard_angle};
use polaris_core::profiling::profile_function;

use crate::{ChartError, ChartResult};

/// Divisors smaller than this are treated as `1.0`.
const MIN_DIVISOR: f32 = 1e-6;

/// Center, radius and angular step of a radial element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialLayout {
    pub center: Vec2,
    /// Radius of the circle itself.
    pub radius: f32,
    /// Radius of everything drawn, ticks and labels included.
    pub outer_radius: f32,
    pub start_angle: f32,
    /// Angle between consecutive ticks.
    pub sweep: f32,
    pub tick_count: usize,
    /// Tick length to use instead of the configured one once the circle
    /// collapsed to a point.
    pub critical_tick_length: Option<f32>,
}

impl RadialLayout {
    /// Largest circle in `bounds`, without ticks.
    ///
    /// `bounds` is snapped to whole pixels first and the radius is floored,
    /// so the circle never exceeds odd-sized or fractional bounds.
    pub fn centered(bounds: Rect, start_angle: f32) -> Self {
        let bounds = bounds.round();
        let center = bounds.center();
        let radius = (bounds.min_side() / 2.0).floor().max(0.0);
        Self {
            center: Vec2::new(pixel_round(center.x), pixel_round(center.y)),
            radius,
            outer_radius: radius,
            start_angle: standard_angle(start_angle),
            sweep: 0.0,
            tick_count: 0,
            critical_tick_length: None,
        }
    }

    /// Largest circle in `bounds` carrying `tick_count` ticks, unfitted.
    pub fn inscribed(bounds: Rect, start_angle: f32, tick_count: usize) -> ChartResult<Self> {
        if tick_count == 0 {
            return Err(ChartError::EmptyScale);
        }
        Ok(Self {
            sweep: 360.0 / tick_count as f32,
            tick_count,
            ..Self::centered(bounds, start_angle)
        })
    }

    /// Angle of tick `index`. Tick 0 points up from the start angle.
    pub fn tick_angle(&self, index: usize) -> f32 {
        standard_angle(self.start_angle - 90.0 + index as f32 * self.sweep)
    }

    pub fn tick_angles(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.tick_count).map(|i| self.tick_angle(i))
    }

    /// Pixel-snapped point at `radius` along `angle`.
    pub fn point(&self, radius: f32, angle: f32) -> Vec2 {
        pixel_point_on_circle(self.center, radius, angle)
    }

    /// Tick length used for placement.
    pub fn effective_tick_length(&self, ticks_enabled: bool, configured: f32) -> f32 {
        if !ticks_enabled {
            return 0.0;
        }
        self.critical_tick_length.unwrap_or(configured)
    }

    /// Square of side `2 * outer_radius` around the center.
    pub fn pixel_bounds(&self) -> Rect {
        Rect::square_around(self.center, self.outer_radius)
    }

    /// Square inside the circle, inset by half the line thickness.
    pub fn remaining_bounds(&self, line_thickness: f32) -> Rect {
        let half = (line_thickness / 2.0).floor();
        let side = ((self.radius - half) * 2.0).max(0.0);
        Rect::new(
            self.center.x - self.radius + half,
            self.center.y - self.radius + half,
            side,
            side,
        )
    }
}

/// Offset that moves a label box centered on its anchor so it sits outside
/// the circle.
///
/// Exact axis angles shift along one axis only. Angles between them shift
/// diagonally.
pub fn label_offset_for_angle(angle: f32, size: Vec2) -> Vec2 {
    let half_w = size.x / 2.0;
    let half_h = size.y / 2.0;

    if angle == 0.0 {
        Vec2::new(half_w, 0.0)
    } else if angle > 0.0 && angle < 90.0 {
        Vec2::new(half_w, half_h)
    } else if angle == 90.0 {
        Vec2::new(0.0, half_h)
    } else if angle > 90.0 && angle < 180.0 {
        Vec2::new(-half_w, half_h)
    } else if angle == 180.0 {
        Vec2::new(-half_w, 0.0)
    } else if angle > 180.0 && angle < 270.0 {
        Vec2::new(-half_w, -half_h)
    } else if angle == 270.0 {
        Vec2::new(0.0, -half_h)
    } else if angle > 270.0 {
        Vec2::new(half_w, -half_h)
    } else {
        Vec2::ZERO
    }
}

/// Measured label boxes, one slot per tick.
///
/// The cache is either empty or exactly as long as the tick count it was
/// filled for.
#[derive(Debug, Clone, Default)]
pub struct LabelBoundsCache {
    slots: Vec<Option<Rect>>,
    invalidations: u64,
}

impl LabelBoundsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<Rect> {
        self.slots.get(index).copied().flatten()
    }

    /// Cached box for `index`, measuring it first if needed.
    pub fn get_or_insert_with(
        &mut self,
        tick_count: usize,
        index: usize,
        measure: impl FnOnce() -> Rect,
    ) -> Rect {
        if self.slots.len() != tick_count {
            self.slots = vec![None; tick_count];
        }
        match self.slots.get_mut(index) {
            Some(Some(rect)) => *rect,
            Some(slot) => *slot.insert(measure()),
            // index out of range for this tick count
            None => measure(),
        }
    }

    /// Replace every slot with `boxes`, one per tick.
    pub fn store(&mut self, boxes: impl IntoIterator<Item = Rect>) {
        self.slots = boxes.into_iter().map(Some).collect();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.invalidations += 1;
    }

    /// How many times the cache was cleared.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of measured slots.
    pub fn measured(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Box of label `index` placed at the end of its tick.
///
/// `measure` returns the box centered on the anchor; the angle offset is
/// applied here.
pub fn label_bounds(
    layout: &RadialLayout,
    index: usize,
    tick_length: f32,
    line_thickness: f32,
    measure: &mut dyn FnMut(usize, Vec2) -> Rect,
) -> Rect {
    let angle = layout.tick_angle(index);
    let anchor = layout.point(layout.radius + tick_length + line_thickness / 2.0, angle);
    let rect = measure(index, anchor);
    rect.translate(label_offset_for_angle(angle, rect.size()))
}

/// Inputs of [`fit_radial_layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    pub bounds: Rect,
    pub start_angle: f32,
    pub tick_count: usize,
    /// Thickness of the circle stroke, at least 1.
    pub line_thickness: f32,
    pub ticks_enabled: bool,
    pub tick_length: f32,
    pub labels_enabled: bool,
}

/// Overshoot past each side, projected back onto the radius.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SideDeltas {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl SideDeltas {
    pub fn max(&self) -> f32 {
        self.left.max(self.top).max(self.right).max(self.bottom)
    }
}

/// Result of [`fit_radial_layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub layout: RadialLayout,
    pub deltas: SideDeltas,
    /// Amount the radius was reduced by.
    pub delta: f32,
}

#[derive(Debug, Clone, Copy)]
struct Extreme {
    value: f32,
    index: usize,
    angle: f32,
}

/// Keep the first extreme on ties.
fn track(slot: &mut Option<Extreme>, candidate: Extreme, beats: fn(f32, f32) -> bool) {
    match slot {
        Some(current) if !beats(candidate.value, current.value) => {}
        _ => *slot = Some(candidate),
    }
}

fn sin_deg(degrees: f32) -> f32 {
    degrees.to_radians().sin()
}

fn cos_deg(degrees: f32) -> f32 {
    degrees.to_radians().cos()
}

fn divisor(value: f32) -> f32 {
    if value.abs() < MIN_DIVISOR { 1.0 } else { value }
}

fn left_divisor(angle: f32) -> f32 {
    divisor(if angle < 180.0 {
        sin_deg(angle - 90.0)
    } else {
        cos_deg(angle - 180.0)
    })
}

fn top_divisor(angle: f32) -> f32 {
    divisor(if angle < 270.0 {
        sin_deg(angle - 180.0)
    } else {
        cos_deg(angle - 270.0)
    })
}

fn right_divisor(angle: f32) -> f32 {
    divisor(if angle < 360.0 {
        sin_deg(angle - 270.0)
    } else {
        cos_deg(angle)
    })
}

fn bottom_divisor(angle: f32) -> f32 {
    divisor(if angle < 90.0 {
        sin_deg(angle)
    } else {
        cos_deg(angle - 90.0)
    })
}

/// Fit a radial layout with ticks and labels into `params.bounds`.
///
/// `params.bounds` is snapped to whole pixels before fitting. `labels` is
/// cleared exactly once. Boxes measured at the unfitted radius are stored
/// back only if the radius did not shrink, since a shrink moves every box.
/// `measure` is only called when labels are enabled.
pub fn fit_radial_layout(
    params: &FitParams,
    labels: &mut LabelBoundsCache,
    measure: &mut dyn FnMut(usize, Vec2) -> Rect,
) -> ChartResult<FitResult> {
    profile_function!();
    let bounds = params.bounds.round();
    let mut layout = RadialLayout::inscribed(bounds, params.start_angle, params.tick_count)?;
    let initial_radius = layout.radius;
    let thickness = params.line_thickness;
    let tick_count = params.tick_count;
    let label_tick_length = layout.effective_tick_length(params.ticks_enabled, params.tick_length);

    labels.clear();
    let mut measured = Vec::with_capacity(if params.labels_enabled { tick_count } else { 0 });

    let mut left = None;
    let mut top = None;
    let mut right = None;
    let mut bottom = None;

    for index in 0..tick_count {
        let angle = layout.tick_angle(index);
        let (min, max) = if params.labels_enabled {
            let rect = label_bounds(&layout, index, label_tick_length, thickness, &mut *measure);
            measured.push(rect);
            (
                Vec2::new(rect.left(), rect.top()),
                Vec2::new(rect.right(), rect.bottom()),
            )
        } else {
            let radius = if params.ticks_enabled {
                layout.radius + params.tick_length + thickness / 2.0
            } else {
                layout.radius + thickness / 2.0
            };
            let p = layout.point(radius, angle);
            (p, p)
        };

        let at = |value| Extreme {
            value,
            index,
            angle,
        };
        track(&mut left, at(min.x), |a, b| a < b);
        track(&mut top, at(min.y), |a, b| a < b);
        track(&mut right, at(max.x), |a, b| a > b);
        track(&mut bottom, at(max.y), |a, b| a > b);
    }

    let (Some(left), Some(top), Some(right), Some(bottom)) = (left, top, right, bottom) else {
        return Err(ChartError::EmptyScale);
    };

    let mut deltas = SideDeltas::default();
    let left_value = pixel_round(left.value);
    let top_value = pixel_round(top.value);
    let right_value = pixel_round(right.value);
    let bottom_value = pixel_round(bottom.value);

    if left_value < bounds.left() {
        deltas.left = pixel_round((bounds.left() - left_value) / left_divisor(left.angle));
    }
    if top_value < bounds.top() {
        deltas.top = pixel_round((bounds.top() - top_value) / top_divisor(top.angle));
    }
    if right_value > bounds.right() {
        deltas.right = pixel_round((right_value - bounds.right()) / right_divisor(right.angle));
    }
    if bottom_value > bounds.bottom() {
        deltas.bottom = pixel_round((bottom_value - bounds.bottom()) / bottom_divisor(bottom.angle));
    }

    let delta = deltas.max();
    if delta > 0.0 {
        layout.radius -= delta;
        if layout.radius < 0.0 {
            layout.radius = 0.0;
            if params.labels_enabled {
                let (extreme, horizontal) = if delta == deltas.left {
                    (left, true)
                } else if delta == deltas.top {
                    (top, false)
                } else if delta == deltas.right {
                    (right, true)
                } else {
                    (bottom, false)
                };
                if let Some(label) = measured.get(extreme.index) {
                    let label_size = if horizontal { label.width } else { label.height };
                    layout.critical_tick_length =
                        Some(bounds.min_side() / 2.0 - label_size - thickness);
                }
            }
            tracing::debug!(
                delta,
                critical_tick_length = ?layout.critical_tick_length,
                "radial layout collapsed"
            );
        }
    } else if !measured.is_empty() {
        labels.store(measured);
    }

    layout.outer_radius = (layout.radius + delta.max(0.0)).min(initial_radius);

    tracing::trace!(
        radius = layout.radius,
        outer_radius = layout.outer_radius,
        ?deltas,
        "radial layout fitted"
    );

    Ok(FitResult {
        layout,
        deltas,
        delta: delta.max(0.0),
    })
}

/// Layout and label boxes cached by a radial element between draws.
///
/// The owner decides when the cache is stale (its BOUNDS state) and calls
/// [`refit`](Self::refit); everything else reads what was stored.
#[derive(Debug, Clone, Default)]
pub struct GeometryCache {
    layout: Option<RadialLayout>,
    deltas: SideDeltas,
    label_bounds: LabelBoundsCache,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self) -> Option<&RadialLayout> {
        self.layout.as_ref()
    }

    /// Side overshoots found by the last fit.
    pub fn deltas(&self) -> SideDeltas {
        self.deltas
    }

    pub fn label_bounds(&self) -> &LabelBoundsCache {
        &self.label_bounds
    }

    pub fn drop_label_bounds(&mut self) {
        self.label_bounds.clear();
    }

    /// Forget the layout and every label box.
    pub fn clear(&mut self) {
        self.layout = None;
        self.deltas = SideDeltas::default();
        self.label_bounds.clear();
    }

    /// Run [`fit_radial_layout`] and store the result.
    pub fn refit(
        &mut self,
        params: &FitParams,
        measure: &mut dyn FnMut(usize, Vec2) -> Rect,
    ) -> ChartResult<RadialLayout> {
        match fit_radial_layout(params, &mut self.label_bounds, measure) {
            Ok(result) => {
                self.layout = Some(result.layout);
                self.deltas = result.deltas;
                Ok(result.layout)
            }
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    /// Cached label box for `index` under the stored layout.
    ///
    /// Returns `None` when no layout was fitted yet.
    pub fn label_bounds_for(
        &mut self,
        index: usize,
        tick_length: f32,
        line_thickness: f32,
        measure: &mut dyn FnMut(usize, Vec2) -> Rect,
    ) -> Option<Rect> {
        let layout = self.layout?;
        Some(
            self.label_bounds
                .get_or_insert_with(layout.tick_count, index, || {
                    label_bounds(&layout, index, tick_length, line_thickness, &mut *measure)
                }),
        )
    }
}
