//! Background grid of a radar chart.
//!
//! Two layouts are supported. [`GridLayout::Circuit`] draws one closed ring
//! per y tick with vertices on the x tick angles. [`GridLayout::Radial`]
//! draws one spoke per x tick from the rim to the center. Bands between
//! consecutive rings or spokes are filled alternately from an odd and an even
//! [`TypedLayer`].

use polaris_core::math::{Vec2, axis_aligned_pixel_shift, standard_angle};
use polaris_core::profiling::profile_function;
use polaris_core::{
    ConsistencyState, Invalidatable, InvalidationState, Rect, Signal, SignalEvent,
};
use serde::{Deserialize, Serialize};

use super::config::RadarGridConfig;
use super::element::{Boundable, DrawDecision, Drawable, VisualBase};
use super::radial::RadialLayout;
use super::scale::{ScaleHandle, ScaleSubscription, ScaleTicks, resubscribe};
use super::typed_layer::TypedLayer;
use crate::{ChartError, ChartResult, Color, Fill, NodeId, Stroke, Surface};

const REDRAW_AND_BOUNDS: Signal = Signal::NEEDS_REDRAW.union(Signal::BOUNDS_CHANGED);

const GEOMETRY_STATES: ConsistencyState = ConsistencyState::POSITION.union(ConsistencyState::BOUNDS);

/// Any scale change moves the rings. Recalculation and reapplication requests
/// are passed on.
fn scale_signal_states(event: &SignalEvent) -> (ConsistencyState, Signal) {
    let mut signals = Signal::BOUNDS_CHANGED;
    if event.has_signal(Signal::NEEDS_RECALCULATION) {
        signals |= Signal::NEEDS_RECALCULATION;
    }
    if event.has_signal(Signal::NEEDS_REAPPLICATION) {
        signals |= Signal::NEEDS_REDRAW;
    }
    (
        ConsistencyState::BOUNDS | ConsistencyState::APPEARANCE,
        signals,
    )
}

/// How grid lines are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridLayout {
    /// Concentric polygons, one per y tick.
    #[default]
    Circuit,
    /// Spokes, one per x tick.
    Radial,
}

/// Default odd band fill.
pub fn default_odd_fill() -> Fill {
    Fill::Solid(Color::WHITE.with_alpha(0.3))
}

/// Default even band fill.
pub fn default_even_fill() -> Fill {
    Fill::Solid(Color::from_hex(0xF5F5F5).with_alpha(0.3))
}

pub fn default_grid_stroke() -> Stroke {
    Stroke::solid(Color::from_hex(0xC1C1C1), 1.0)
}

/// Radar chart grid.
#[derive(Debug)]
pub struct RadarGrid {
    base: VisualBase,
    layout: GridLayout,
    stroke: Stroke,
    odd_fill: Fill,
    even_fill: Fill,
    start_angle: f32,
    draw_first_line: bool,
    draw_last_line: bool,
    is_minor: bool,
    parent_bounds: Option<Rect>,
    x_scale: Option<ScaleSubscription>,
    y_scale: Option<ScaleSubscription>,
    even: TypedLayer,
    odd: TypedLayer,
    line: Option<NodeId>,
}

impl Default for RadarGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarGrid {
    pub fn new() -> Self {
        Self {
            base: VisualBase::new(
                ConsistencyState::BOUNDS
                    | ConsistencyState::APPEARANCE
                    | ConsistencyState::POSITION,
                REDRAW_AND_BOUNDS | Signal::NEEDS_RECALCULATION,
            ),
            layout: GridLayout::Circuit,
            stroke: default_grid_stroke(),
            odd_fill: default_odd_fill(),
            even_fill: default_even_fill(),
            start_angle: 0.0,
            draw_first_line: true,
            draw_last_line: true,
            is_minor: false,
            parent_bounds: None,
            x_scale: None,
            y_scale: None,
            even: TypedLayer::new(),
            odd: TypedLayer::new(),
            line: None,
        }
    }

    /// Register scale relays whose attachment had to be deferred.
    fn ensure_scale_relays(&mut self) {
        let target = self.base.invalidation();
        let late = [&mut self.x_scale, &mut self.y_scale]
            .into_iter()
            .flatten()
            .fold(false, |late, scale| {
                scale.relay_to(target, scale_signal_states) | late
            });
        if late {
            self.base.invalidate(GEOMETRY_STATES, REDRAW_AND_BOUNDS);
        }
    }

    pub fn enabled(&self) -> bool {
        self.base.enabled()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.base.set_enabled(enabled);
    }

    pub fn z_index(&self) -> f32 {
        self.base.z_index()
    }

    pub fn set_z_index(&mut self, z_index: f32) {
        self.base.set_z_index(z_index);
    }

    pub fn container(&self) -> Option<NodeId> {
        self.base.container()
    }

    pub fn set_container(&mut self, container: Option<NodeId>) {
        self.base.set_container(container);
    }

    pub fn x_scale(&self) -> Option<&ScaleHandle> {
        self.x_scale.as_ref().map(ScaleSubscription::handle)
    }

    /// Angular scale: one vertex or spoke per tick.
    pub fn set_x_scale(&mut self, scale: Option<ScaleHandle>) {
        if resubscribe(
            &mut self.x_scale,
            scale,
            self.base.invalidation(),
            scale_signal_states,
        ) {
            self.base.invalidate(GEOMETRY_STATES, REDRAW_AND_BOUNDS);
        }
    }

    pub fn y_scale(&self) -> Option<&ScaleHandle> {
        self.y_scale.as_ref().map(ScaleSubscription::handle)
    }

    /// Radial scale: one ring per tick. Only used by [`GridLayout::Circuit`].
    pub fn set_y_scale(&mut self, scale: Option<ScaleHandle>) {
        if resubscribe(
            &mut self.y_scale,
            scale,
            self.base.invalidation(),
            scale_signal_states,
        ) {
            self.base.invalidate(GEOMETRY_STATES, REDRAW_AND_BOUNDS);
        }
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: GridLayout) {
        if self.layout != layout {
            self.layout = layout;
            self.base
                .invalidate(ConsistencyState::POSITION, REDRAW_AND_BOUNDS);
        }
    }

    pub fn stroke(&self) -> &Stroke {
        &self.stroke
    }

    pub fn set_stroke(&mut self, stroke: Stroke) {
        if self.stroke != stroke {
            self.stroke = stroke;
            self.invalidate_appearance();
        }
    }

    pub fn odd_fill(&self) -> Fill {
        self.odd_fill
    }

    pub fn set_odd_fill(&mut self, fill: impl Into<Fill>) {
        let fill = fill.into();
        if self.odd_fill != fill {
            self.odd_fill = fill;
            self.invalidate_appearance();
        }
    }

    pub fn even_fill(&self) -> Fill {
        self.even_fill
    }

    pub fn set_even_fill(&mut self, fill: impl Into<Fill>) {
        let fill = fill.into();
        if self.even_fill != fill {
            self.even_fill = fill;
            self.invalidate_appearance();
        }
    }

    // Bands only exist for present fills, so a fill change regenerates them.
    fn invalidate_appearance(&mut self) {
        self.base.invalidate(
            ConsistencyState::APPEARANCE | ConsistencyState::BOUNDS,
            Signal::NEEDS_REDRAW,
        );
    }

    pub fn start_angle(&self) -> f32 {
        self.start_angle
    }

    pub fn set_start_angle(&mut self, angle: f32) {
        let angle = standard_angle(angle);
        if self.start_angle != angle {
            self.start_angle = angle;
            self.base
                .invalidate(ConsistencyState::BOUNDS, REDRAW_AND_BOUNDS);
        }
    }

    pub fn draw_first_line(&self) -> bool {
        self.draw_first_line
    }

    pub fn set_draw_first_line(&mut self, draw: bool) {
        if self.draw_first_line != draw {
            self.draw_first_line = draw;
            self.base
                .invalidate(ConsistencyState::POSITION, REDRAW_AND_BOUNDS);
        }
    }

    pub fn draw_last_line(&self) -> bool {
        self.draw_last_line
    }

    pub fn set_draw_last_line(&mut self, draw: bool) {
        if self.draw_last_line != draw {
            self.draw_last_line = draw;
            self.base
                .invalidate(ConsistencyState::POSITION, REDRAW_AND_BOUNDS);
        }
    }

    pub fn is_minor(&self) -> bool {
        self.is_minor
    }

    /// Use the minor ticks of a numeric y scale.
    pub fn set_is_minor(&mut self, is_minor: bool) {
        if self.is_minor != is_minor {
            self.is_minor = is_minor;
            self.base.invalidate(
                ConsistencyState::POSITION | ConsistencyState::APPEARANCE,
                REDRAW_AND_BOUNDS,
            );
        }
    }

    /// Layer holding the even bands.
    pub fn even_layer(&self) -> &TypedLayer {
        &self.even
    }

    /// Layer holding the odd bands.
    pub fn odd_layer(&self) -> &TypedLayer {
        &self.odd
    }

    /// Path holding every grid line.
    pub fn line(&self) -> Option<NodeId> {
        self.line
    }

    fn ensure_line(&mut self, surface: &mut Surface) -> NodeId {
        match self.line {
            Some(line) if surface.contains(line) => line,
            _ => {
                let line = surface.create_path();
                self.line = Some(line);
                line
            }
        }
    }

    fn layer_for(&mut self, index: usize) -> (&mut TypedLayer, Fill) {
        if index % 2 == 0 {
            (&mut self.even, self.even_fill)
        } else {
            (&mut self.odd, self.odd_fill)
        }
    }

    fn x_ticks(&self) -> ChartResult<ScaleTicks> {
        let scale = self.x_scale.as_ref().ok_or(ChartError::ScaleNotSet)?;
        let scale = scale
            .handle()
            .try_borrow()
            .map_err(|_| ChartError::InvalidConfig("x scale is mutably borrowed".to_string()))?;
        Ok(scale.ticks())
    }

    /// Ratios of the y ticks, in tick order.
    fn y_ratios(&self) -> ChartResult<Vec<f64>> {
        let scale = self.y_scale.as_ref().ok_or(ChartError::ScaleNotSet)?;
        let scale = scale
            .handle()
            .try_borrow()
            .map_err(|_| ChartError::InvalidConfig("y scale is mutably borrowed".to_string()))?;
        let ticks = if self.is_minor && !scale.is_ordinal() {
            scale.minor_ticks()
        } else {
            scale.ticks()
        };
        Ok(ticks.values.iter().map(|&v| scale.transform(v)).collect())
    }

    fn draw_circuit(
        &mut self,
        surface: &mut Surface,
        layout: &RadialLayout,
        line: NodeId,
        ratios: &[f64],
    ) {
        let vertices = layout.tick_count;
        let last = ratios.len().saturating_sub(1);
        let mut prev_radius: Option<f32> = None;

        for (i, &ratio) in ratios.iter().enumerate() {
            let ring_radius = layout.radius * ratio as f32;

            let (layer, fill) = self.layer_for(i);
            if !fill.is_none()
                && let Some(prev) = prev_radius
            {
                let band = layer.gen_next_child(surface);
                ring(surface, band, layout, ring_radius, vertices);
                for j in (0..=vertices).rev() {
                    surface.line_to(band, layout.point(prev, layout.tick_angle(j)));
                }
                surface.close(band);
            }

            let draw_line = match i {
                0 => self.draw_first_line,
                i if i == last => self.draw_last_line,
                _ => true,
            };
            if draw_line {
                ring(surface, line, layout, ring_radius, vertices);
                surface.close(line);
            }

            prev_radius = Some(ring_radius);
        }
    }

    fn draw_radial(&mut self, surface: &mut Surface, layout: &RadialLayout, line: NodeId) {
        let center = layout.center;
        let thickness = self.stroke.layout_thickness();
        let mut prev: Option<Vec2> = None;

        for i in 0..layout.tick_count {
            let angle = layout.tick_angle(i);
            let shift = axis_aligned_pixel_shift(angle, thickness);
            let p = layout.point(layout.radius, angle);

            let (layer, fill) = self.layer_for(i);
            if !fill.is_none()
                && let Some(prev) = prev
            {
                let band = layer.gen_next_child(surface);
                wedge(surface, band, p, center, prev);
            }

            surface.move_to(line, p + shift);
            surface.line_to(line, center + shift);
            prev = Some(p);
        }

        // Band between the last spoke and the first one.
        let n = layout.tick_count;
        let (layer, fill) = self.layer_for(n);
        if !fill.is_none()
            && let Some(prev) = prev
        {
            let p = layout.point(layout.radius, layout.tick_angle(n));
            let band = layer.gen_next_child(surface);
            wedge(surface, band, p, center, prev);
        }
    }

    fn draw_geometry(&mut self, surface: &mut Surface, line: NodeId) -> ChartResult<bool> {
        let Some(bounds) = self.parent_bounds else {
            tracing::debug!("radar grid has no bounds yet");
            return Ok(false);
        };

        let x_ticks = self.x_ticks()?;
        let ratios = match self.layout {
            GridLayout::Circuit => self.y_ratios()?,
            GridLayout::Radial => Vec::new(),
        };

        surface.clear_path(line);
        self.even.clear(surface);
        self.odd.clear(surface);

        surface.set_clip(line, Some(bounds));
        self.even.set_clip(surface, Some(bounds));
        self.odd.set_clip(surface, Some(bounds));

        if x_ticks.is_empty() {
            tracing::debug!("radar grid has no x ticks");
            return Ok(true);
        }
        let layout = RadialLayout::inscribed(bounds, self.start_angle, x_ticks.len())?;

        match self.layout {
            GridLayout::Circuit => self.draw_circuit(surface, &layout, line, &ratios),
            GridLayout::Radial => self.draw_radial(surface, &layout, line),
        }

        tracing::trace!(
            layout = ?self.layout,
            radius = layout.radius,
            even = self.even.children().len(),
            odd = self.odd.children().len(),
            "radar grid geometry drawn"
        );
        Ok(true)
    }

    /// Snapshot of every configurable option.
    pub fn serialize(&self) -> RadarGridConfig {
        RadarGridConfig {
            enabled: Some(self.enabled()),
            z_index: Some(self.z_index()),
            parent_bounds: self.parent_bounds.map(Into::into),
            stroke: Some(self.stroke.clone()),
            layout: Some(self.layout),
            odd_fill: Some(self.odd_fill),
            even_fill: Some(self.even_fill),
            start_angle: Some(self.start_angle),
            draw_first_line: Some(self.draw_first_line),
            draw_last_line: Some(self.draw_last_line),
            is_minor: Some(self.is_minor),
        }
    }

    /// Apply every option present in `config` with a single broadcast.
    pub fn deserialize(&mut self, config: &RadarGridConfig) {
        self.batch(|grid| {
            if let Some(enabled) = config.enabled {
                grid.set_enabled(enabled);
            }
            if let Some(z_index) = config.z_index {
                grid.set_z_index(z_index);
            }
            if let Some(bounds) = config.parent_bounds {
                grid.set_parent_bounds(Some(bounds.into()));
            }
            if let Some(stroke) = &config.stroke {
                grid.set_stroke(stroke.clone());
            }
            if let Some(layout) = config.layout {
                grid.set_layout(layout);
            }
            if let Some(fill) = config.odd_fill {
                grid.set_odd_fill(fill);
            }
            if let Some(fill) = config.even_fill {
                grid.set_even_fill(fill);
            }
            if let Some(angle) = config.start_angle {
                grid.set_start_angle(angle);
            }
            if let Some(draw) = config.draw_first_line {
                grid.set_draw_first_line(draw);
            }
            if let Some(draw) = config.draw_last_line {
                grid.set_draw_last_line(draw);
            }
            if let Some(is_minor) = config.is_minor {
                grid.set_is_minor(is_minor);
            }
        });
    }
}

/// Append a closed-looking ring: `vertices` points plus the first one again.
fn ring(surface: &mut Surface, path: NodeId, layout: &RadialLayout, radius: f32, vertices: usize) {
    for j in 0..=vertices {
        let p = layout.point(radius, layout.tick_angle(j));
        if j == 0 {
            surface.move_to(path, p);
        } else {
            surface.line_to(path, p);
        }
    }
}

fn wedge(surface: &mut Surface, path: NodeId, p: Vec2, center: Vec2, prev: Vec2) {
    surface.move_to(path, p);
    surface.line_to(path, center);
    surface.line_to(path, prev);
    surface.close(path);
}

impl Invalidatable for RadarGrid {
    fn invalidation(&self) -> &InvalidationState {
        self.base.invalidation()
    }

    fn invalidation_mut(&mut self) -> &mut InvalidationState {
        self.base.invalidation_mut()
    }
}

impl Drawable for RadarGrid {
    /// Fails with [`ChartError::ScaleNotSet`] when the x scale is missing, or
    /// the y scale in circuit layout.
    fn draw(&mut self, surface: &mut Surface) -> ChartResult<()> {
        profile_function!();
        self.ensure_scale_relays();

        let missing_scale = self.x_scale.is_none()
            || (self.layout == GridLayout::Circuit && self.y_scale.is_none());
        if missing_scale {
            tracing::error!(layout = ?self.layout, "cannot draw radar grid: scale not set");
            return Err(ChartError::ScaleNotSet);
        }

        match self.base.check_drawing_needed() {
            DrawDecision::Skip => return Ok(()),
            DrawDecision::Remove => {
                self.remove(surface);
                tracing::debug!("radar grid disabled");
                return Ok(());
            }
            DrawDecision::Proceed => {}
        }

        let line = self.ensure_line(surface);
        let mut apply_appearance = self
            .base
            .has_invalidation_state(ConsistencyState::APPEARANCE);

        if self.base.has_invalidation_state(ConsistencyState::Z_INDEX) {
            let z_index = self.base.z_index();
            self.even.set_z_index(surface, z_index);
            self.odd.set_z_index(surface, z_index);
            surface.set_z_index(line, z_index);
            self.base.mark_consistent(ConsistencyState::Z_INDEX);
        }

        if self.base.has_invalidation_state(ConsistencyState::CONTAINER) {
            let container = self.base.container();
            self.even.set_parent(surface, container);
            self.odd.set_parent(surface, container);
            surface.set_parent(line, container);
            self.base.mark_consistent(ConsistencyState::CONTAINER);
        }

        if self.base.has_invalidation_state(GEOMETRY_STATES) {
            match self.draw_geometry(surface, line) {
                Ok(true) => {
                    self.base.mark_consistent(GEOMETRY_STATES);
                    apply_appearance = true;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(%err, "cannot draw radar grid");
                    return Err(err);
                }
            }
        }

        if apply_appearance {
            surface.set_stroke(line, Some(self.stroke.clone()));
            self.odd.set_fill(surface, self.odd_fill.color());
            self.even.set_fill(surface, self.even_fill.color());
            self.base.mark_consistent(ConsistencyState::APPEARANCE);
        }

        Ok(())
    }

    fn remove(&mut self, surface: &mut Surface) {
        self.even.set_parent(surface, None);
        self.odd.set_parent(surface, None);
        if let Some(line) = self.line {
            surface.set_parent(line, None);
        }
    }
}

impl Boundable for RadarGrid {
    fn parent_bounds(&self) -> Option<Rect> {
        self.parent_bounds
    }

    /// Bounds are snapped to whole pixels.
    fn set_parent_bounds(&mut self, bounds: Option<Rect>) {
        let bounds = bounds.map(|b| b.round());
        if self.parent_bounds != bounds {
            self.parent_bounds = bounds;
            self.base
                .invalidate(ConsistencyState::BOUNDS, REDRAW_AND_BOUNDS);
        }
    }

    /// Square around the outer ring.
    fn pixel_bounds(&mut self) -> Rect {
        self.parent_bounds
            .map(|bounds| RadialLayout::centered(bounds, self.start_angle).pixel_bounds())
            .unwrap_or(Rect::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::scale::{LinearScale, OrdinalScale};
    use crate::PathCommand;

    fn grid_in(surface: &Surface) -> RadarGrid {
        let mut grid = RadarGrid::new();
        grid.set_x_scale(Some(
            OrdinalScale::from_names(["a", "b", "c", "d"]).into_handle(),
        ));
        grid.set_y_scale(Some(
            LinearScale::new(0.0, 100.0).with_interval(25.0).into_handle(),
        ));
        grid.set_parent_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
        grid.set_container(Some(surface.root()));
        grid
    }

    #[test]
    fn test_circuit_draws_one_ring_per_y_tick() {
        let mut surface = Surface::new();
        let mut grid = grid_in(&surface);
        grid.draw(&mut surface).unwrap();
        assert!(grid.is_consistent());

        let line = grid.line().expect("line");
        assert_eq!(surface.path(line).map(|p| p.subpath_count()), Some(5));
        // Bands between 5 rings: indices 1..=4, odd 1 and 3, even 2 and 4.
        assert_eq!(grid.odd_layer().children().len(), 2);
        assert_eq!(grid.even_layer().children().len(), 2);
    }

    #[test]
    fn test_first_and_last_lines_are_optional() {
        let mut surface = Surface::new();
        let mut grid = grid_in(&surface);
        grid.set_draw_first_line(false);
        grid.set_draw_last_line(false);
        grid.draw(&mut surface).unwrap();

        let line = grid.line().expect("line");
        assert_eq!(surface.path(line).map(|p| p.subpath_count()), Some(3));
    }

    #[test]
    fn test_interlace_returns_along_previous_ring() {
        let mut surface = Surface::new();
        let mut grid = grid_in(&surface);
        grid.draw(&mut surface).unwrap();

        let band = grid.odd_layer().children()[0];
        let path = surface.path(band).expect("band");
        // Ring of 4 vertices plus closing vertex, same back, then close.
        assert_eq!(path.len(), 11);
        assert_eq!(path.commands().last(), Some(&PathCommand::Close));
    }

    #[test]
    fn test_radial_layout_needs_only_x_scale() {
        let mut surface = Surface::new();
        let mut grid = grid_in(&surface);
        grid.set_y_scale(None);
        grid.set_layout(GridLayout::Radial);
        grid.draw(&mut surface).unwrap();

        let line = grid.line().expect("line");
        assert_eq!(surface.path(line).map(|p| p.subpath_count()), Some(4));
        // Wedges after spokes 1, 2, 3 plus the closing wedge.
        let bands = grid.odd_layer().children().len() + grid.even_layer().children().len();
        assert_eq!(bands, 4);
    }

    #[test]
    fn test_missing_y_scale_fails_in_circuit() {
        let mut surface = Surface::new();
        let mut grid = grid_in(&surface);
        grid.set_y_scale(None);
        assert_eq!(grid.draw(&mut surface), Err(ChartError::ScaleNotSet));
    }

    #[test]
    fn test_fill_change_reapplies_appearance() {
        let mut surface = Surface::new();
        let mut grid = grid_in(&surface);
        grid.draw(&mut surface).unwrap();

        grid.set_odd_fill(Color::BLACK);
        assert!(grid.has_invalidation_state(ConsistencyState::APPEARANCE));
        grid.draw(&mut surface).unwrap();

        let band = grid.odd_layer().children()[0];
        assert_eq!(
            surface.path_node(band).and_then(|n| n.fill),
            Some(Color::BLACK)
        );
    }

    #[test]
    fn test_scale_signal_invalidates_bounds() {
        let mut surface = Surface::new();
        let mut grid = RadarGrid::new();
        let y = LinearScale::new(0.0, 10.0);
        let y = std::rc::Rc::new(std::cell::RefCell::new(y));
        grid.set_x_scale(Some(OrdinalScale::from_names(["a", "b", "c"]).into_handle()));
        grid.set_y_scale(Some(y.clone()));
        grid.set_parent_bounds(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        grid.draw(&mut surface).unwrap();
        assert!(grid.is_consistent());

        y.borrow_mut().set_range(0.0, 20.0);
        assert!(grid.has_invalidation_state(ConsistencyState::BOUNDS));
    }
}
