//! Circular axis for radar charts.
//!
//! The axis draws a closed polygon through one point per scale tick, tick
//! marks pointing outwards and a label at the end of every tick. It owns its
//! [`LabelsFactory`] and [`RadialTicks`]. Their broadcasts, and those of the
//! scale, are relayed into the axis' own dirty states as they happen, so the
//! axis is dirty (and has told its listeners) before the call that changed a
//! child or the scale returns.

use polaris_core::math::{Vec2, axis_aligned_pixel_shift, standard_angle};
use polaris_core::profiling::profile_function;
use polaris_core::{ConsistencyState, Invalidatable, InvalidationState, Rect, Signal, SignalEvent};

use super::config::RadarAxisConfig;
use super::element::{Boundable, DrawDecision, Drawable, VisualBase};
use super::labels::{LabelContext, LabelsFactory, LabelsSettings};
use super::radial::{FitParams, GeometryCache, RadialLayout, label_offset_for_angle};
use super::scale::{ScaleHandle, ScaleSubscription, ScaleTicks, resubscribe};
use super::ticks::{RadialTicks, TicksSettings};
use crate::{ChartError, ChartResult, Color, LineCap, LineJoin, NodeId, Stroke, Surface};

/// States that change together whenever the axis geometry moves.
pub const ALL_VISUAL_STATES: ConsistencyState = ConsistencyState::APPEARANCE
    .union(ConsistencyState::LABELS)
    .union(ConsistencyState::TICKS)
    .union(ConsistencyState::BOUNDS);

const REDRAW_AND_BOUNDS: Signal = Signal::NEEDS_REDRAW.union(Signal::BOUNDS_CHANGED);

const NOTHING: (ConsistencyState, Signal) = (ConsistencyState::empty(), Signal::empty());

/// Label size changes move the whole axis; restyles only repaint labels.
fn labels_signal_states(event: &SignalEvent) -> (ConsistencyState, Signal) {
    if event.has_signal(Signal::BOUNDS_CHANGED) {
        (ALL_VISUAL_STATES, REDRAW_AND_BOUNDS)
    } else if event.has_signal(Signal::NEEDS_REDRAW) {
        (ConsistencyState::LABELS, Signal::NEEDS_REDRAW)
    } else {
        NOTHING
    }
}

fn ticks_signal_states(event: &SignalEvent) -> (ConsistencyState, Signal) {
    if event.has_signal(Signal::BOUNDS_CHANGED) {
        (ALL_VISUAL_STATES, REDRAW_AND_BOUNDS)
    } else if event.has_signal(Signal::NEEDS_REDRAW) {
        (ConsistencyState::TICKS, Signal::NEEDS_REDRAW)
    } else {
        NOTHING
    }
}

fn scale_signal_states(event: &SignalEvent) -> (ConsistencyState, Signal) {
    if event.has_signal(Signal::NEEDS_REAPPLICATION) {
        (ALL_VISUAL_STATES, REDRAW_AND_BOUNDS)
    } else {
        NOTHING
    }
}

fn default_stroke() -> Stroke {
    Stroke::solid(Color::BLACK, 1.0)
        .with_opacity(0.1)
        .with_line_join(LineJoin::Round)
        .with_line_cap(LineCap::Square)
}

/// Tick data read from the scale once per pass.
struct TickData {
    ticks: ScaleTicks,
    min: Option<f64>,
    max: Option<f64>,
}

fn label_context(axis_name: &str, index: usize, data: &TickData) -> LabelContext {
    let tick_value = data.ticks.values.get(index).copied().unwrap_or_default();
    let value = match data.ticks.name(index) {
        Some(name) => name.to_string(),
        None => tick_value.to_string(),
    };
    LabelContext {
        index,
        value,
        tick_value,
        axis_name: axis_name.to_string(),
        min: data.min,
        max: data.max,
    }
}

/// Radar (circular) axis.
#[derive(Debug)]
pub struct RadarAxis {
    base: VisualBase,
    name: String,
    stroke: Stroke,
    start_angle: f32,
    parent_bounds: Option<Rect>,
    scale: Option<ScaleSubscription>,
    labels: LabelsFactory,
    ticks: RadialTicks,
    geometry: GeometryCache,
    line: Option<NodeId>,
}

impl Default for RadarAxis {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarAxis {
    pub fn new() -> Self {
        let base = VisualBase::new(ALL_VISUAL_STATES, REDRAW_AND_BOUNDS);
        let labels = LabelsFactory::new();
        let ticks = RadialTicks::new();
        labels
            .invalidation()
            .relay_signals(base.invalidation(), labels_signal_states);
        ticks
            .invalidation()
            .relay_signals(base.invalidation(), ticks_signal_states);

        Self {
            base,
            name: "axis".to_string(),
            stroke: default_stroke(),
            start_angle: 0.0,
            parent_bounds: None,
            scale: None,
            labels,
            ticks,
            geometry: GeometryCache::new(),
            line: None,
        }
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    /// Register the scale relay if attaching it had to be deferred.
    ///
    /// Scale changes made while the relay was missing went unseen, so a late
    /// relay invalidates the whole axis.
    fn ensure_scale_relay(&mut self) {
        if let Some(scale) = self.scale.as_mut()
            && scale.relay_to(self.base.invalidation(), scale_signal_states)
        {
            self.base.invalidate(ALL_VISUAL_STATES, REDRAW_AND_BOUNDS);
        }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Passed to label formatters. Does not invalidate anything.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
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

    pub fn stroke(&self) -> &Stroke {
        &self.stroke
    }

    /// A thickness change moves ticks and labels, anything else only restyles
    /// the line.
    pub fn set_stroke(&mut self, stroke: Stroke) {
        if self.stroke == stroke {
            return;
        }
        let old = self.stroke.layout_thickness();
        let new = stroke.layout_thickness();
        self.stroke = stroke;
        if old == new {
            self.base
                .invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);
        } else {
            self.base.invalidate(ALL_VISUAL_STATES, REDRAW_AND_BOUNDS);
        }
    }

    pub fn start_angle(&self) -> f32 {
        self.start_angle
    }

    /// Normalized into `[0, 360)`; non-finite angles become `0`.
    pub fn set_start_angle(&mut self, angle: f32) {
        let angle = standard_angle(angle);
        if self.start_angle != angle {
            self.start_angle = angle;
            self.base.invalidate(ALL_VISUAL_STATES, REDRAW_AND_BOUNDS);
        }
    }

    pub fn scale(&self) -> Option<&ScaleHandle> {
        self.scale.as_ref().map(ScaleSubscription::handle)
    }

    /// Attach a scale, or detach with `None`. Setting the same instance again
    /// is a no-op.
    pub fn set_scale(&mut self, scale: Option<ScaleHandle>) {
        if resubscribe(
            &mut self.scale,
            scale,
            self.base.invalidation(),
            scale_signal_states,
        ) {
            self.base.invalidate(ALL_VISUAL_STATES, REDRAW_AND_BOUNDS);
        }
    }

    pub fn labels(&self) -> &LabelsFactory {
        &self.labels
    }

    /// Mutate the labels factory. Its broadcasts reach the axis right away.
    pub fn update_labels<R>(&mut self, f: impl FnOnce(&mut LabelsFactory) -> R) -> R {
        let result = f(&mut self.labels);
        if self.base.has_invalidation_state(ConsistencyState::BOUNDS) {
            self.geometry.drop_label_bounds();
        }
        result
    }

    /// Replace all label settings.
    pub fn set_labels(&mut self, settings: LabelsSettings) {
        self.update_labels(|labels| labels.apply_settings(settings));
        self.geometry.drop_label_bounds();
        self.base.invalidate(
            ConsistencyState::APPEARANCE | ConsistencyState::BOUNDS,
            Signal::NEEDS_REDRAW,
        );
    }

    pub fn ticks(&self) -> &RadialTicks {
        &self.ticks
    }

    /// Mutate the ticks renderer. Its broadcasts reach the axis right away.
    pub fn update_ticks<R>(&mut self, f: impl FnOnce(&mut RadialTicks) -> R) -> R {
        f(&mut self.ticks)
    }

    /// Replace all tick settings.
    pub fn set_ticks(&mut self, settings: TicksSettings) {
        self.update_ticks(|ticks| ticks.apply_settings(settings));
        self.base.invalidate(
            ConsistencyState::APPEARANCE | ConsistencyState::BOUNDS,
            Signal::NEEDS_REDRAW,
        );
    }

    /// The closed line path, once drawn.
    pub fn line(&self) -> Option<NodeId> {
        self.line
    }

    /// Layout from the last fit, if it is still valid.
    pub fn layout(&self) -> Option<&RadialLayout> {
        if self
            .base
            .has_invalidation_state(ConsistencyState::BOUNDS)
        {
            return None;
        }
        self.geometry.layout()
    }

    pub fn geometry(&self) -> &GeometryCache {
        &self.geometry
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    fn tick_data(&self) -> ChartResult<TickData> {
        let subscription = self.scale.as_ref().ok_or(ChartError::ScaleNotSet)?;
        let scale = subscription
            .handle()
            .try_borrow()
            .map_err(|_| ChartError::InvalidConfig("scale is mutably borrowed".to_string()))?;
        Ok(TickData {
            ticks: scale.ticks(),
            min: scale.minimum(),
            max: scale.maximum(),
        })
    }

    /// Fitted layout, recomputed when BOUNDS is dirty.
    fn calculate_axis_bounds(&mut self, data: &TickData) -> ChartResult<RadialLayout> {
        if let Some(layout) = self.geometry.layout()
            && !self
                .base
                .has_invalidation_state(ConsistencyState::BOUNDS)
        {
            return Ok(*layout);
        }

        let params = FitParams {
            bounds: self.parent_bounds.unwrap_or(Rect::ZERO),
            start_angle: self.start_angle,
            tick_count: data.ticks.len(),
            line_thickness: self.stroke.layout_thickness(),
            ticks_enabled: self.ticks.enabled(),
            tick_length: self.ticks.length(),
            labels_enabled: self.labels.enabled(),
        };
        let labels = &self.labels;
        let name = self.name.as_str();
        let mut measure =
            |index: usize, anchor: Vec2| labels.measure(&label_context(name, index, data), anchor);
        let layout = self.geometry.refit(&params, &mut measure)?;

        tracing::debug!(
            axis = %self.name,
            radius = layout.radius,
            outer_radius = layout.outer_radius,
            "radar axis bounds calculated"
        );
        self.base.mark_consistent(ConsistencyState::BOUNDS);
        Ok(layout)
    }

    fn current_layout(&mut self) -> ChartResult<RadialLayout> {
        self.ensure_scale_relay();
        let data = self.tick_data()?;
        self.calculate_axis_bounds(&data)
    }

    /// Space inside the circle, for content drawn within the axis.
    pub fn get_remaining_bounds(&mut self) -> Rect {
        let Some(bounds) = self.parent_bounds else {
            return Rect::ZERO;
        };
        let layout = self.current_layout().unwrap_or_else(|err| {
            tracing::debug!(axis = %self.name, %err, "remaining bounds without ticks");
            RadialLayout::centered(bounds, self.start_angle)
        });
        layout.remaining_bounds(self.stroke.layout_thickness())
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

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

    fn draw_passes(&mut self, surface: &mut Surface, data: &TickData) -> ChartResult<()> {
        let line = self.ensure_line(surface);
        let mut draw_line = false;
        let mut draw_ticks = false;
        let mut draw_labels = false;

        if self.base.has_invalidation_state(ConsistencyState::APPEARANCE) {
            surface.clear_path(line);
            surface.set_stroke(line, Some(self.stroke.clone()));
            draw_line = true;
            self.base.mark_consistent(ConsistencyState::APPEARANCE);
        }

        if self.base.has_invalidation_state(ConsistencyState::Z_INDEX) {
            let z_index = self.base.z_index();
            surface.set_z_index(line, z_index);
            self.ticks.set_z_index(z_index);
            self.labels.set_z_index(z_index);
            self.ticks.apply_placement(surface);
            self.labels.apply_placement(surface);
            self.base.mark_consistent(ConsistencyState::Z_INDEX);
        }

        if self.base.has_invalidation_state(ConsistencyState::CONTAINER) {
            let container = self.base.container();
            surface.set_parent(line, container);
            self.ticks.set_container(container);
            self.labels.set_container(container);
            self.ticks.apply_placement(surface);
            self.labels.apply_placement(surface);
            self.base.mark_consistent(ConsistencyState::CONTAINER);
        }

        if self.base.has_invalidation_state(ConsistencyState::TICKS) {
            self.ticks.draw(surface);
            draw_ticks = true;
            self.base.mark_consistent(ConsistencyState::TICKS);
        }

        if self.base.has_invalidation_state(ConsistencyState::LABELS) {
            if self.labels.container().is_none() {
                self.labels.set_container(self.base.container());
            }
            self.labels.set_parent_bounds(self.parent_bounds);
            self.labels.clear();
            draw_labels = true;
            self.base.mark_consistent(ConsistencyState::LABELS);
        }

        if !(draw_line || draw_ticks || draw_labels) {
            return Ok(());
        }

        let layout = self.calculate_axis_bounds(data)?;
        let line_thickness = self.stroke.layout_thickness();
        let half_thickness = (line_thickness / 2.0).floor();
        let tick_length = layout.effective_tick_length(self.ticks.enabled(), self.ticks.length());
        let tick_thickness = self.ticks.stroke().layout_thickness();

        for index in 0..layout.tick_count {
            let angle = layout.tick_angle(index);

            if draw_line {
                let p = layout.point(layout.radius, angle);
                if index == 0 {
                    surface.move_to(line, p);
                } else {
                    surface.line_to(line, p);
                }
            }

            if draw_ticks || draw_labels {
                let shift = axis_aligned_pixel_shift(angle, tick_thickness);
                let start = layout.point(layout.radius + half_thickness, angle) + shift;
                let end = layout.point(layout.radius + tick_length + half_thickness, angle) + shift;

                if draw_ticks {
                    self.ticks.draw_tick(surface, start, end);
                }
                if draw_labels {
                    let ctx = label_context(&self.name, index, data);
                    let bounds = {
                        let labels = &self.labels;
                        let name = self.name.as_str();
                        let mut measure = |i: usize, anchor: Vec2| {
                            labels.measure(&label_context(name, i, data), anchor)
                        };
                        self.geometry.label_bounds_for(
                            index,
                            tick_length,
                            line_thickness,
                            &mut measure,
                        )
                    };
                    let offset = bounds
                        .map(|b| label_offset_for_angle(angle, b.size()))
                        .unwrap_or_default();
                    self.labels.add(&ctx, end + offset);
                }
            }
        }

        if draw_line && layout.tick_count != 0 {
            surface.close(line);
        }
        self.labels.draw(surface);

        tracing::trace!(
            axis = %self.name,
            ticks = layout.tick_count,
            draw_line,
            draw_ticks,
            draw_labels,
            "radar axis drawn"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Snapshot of every configurable option.
    pub fn serialize(&self) -> RadarAxisConfig {
        RadarAxisConfig {
            enabled: Some(self.enabled()),
            z_index: Some(self.z_index()),
            name: Some(self.name.clone()),
            stroke: Some(self.stroke.clone()),
            start_angle: Some(self.start_angle),
            labels: Some(self.labels.settings().clone()),
            ticks: Some(self.ticks.settings().clone()),
        }
    }

    /// Apply every option present in `config`, broadcasting at most once.
    pub fn deserialize(&mut self, config: &RadarAxisConfig) {
        self.base.suspend_signals_dispatching();

        if let Some(enabled) = config.enabled {
            self.set_enabled(enabled);
        }
        if let Some(z_index) = config.z_index {
            self.set_z_index(z_index);
        }
        if let Some(labels) = &config.labels {
            self.set_labels(labels.clone());
        }
        if let Some(ticks) = &config.ticks {
            self.set_ticks(ticks.clone());
        }
        if let Some(name) = &config.name {
            self.set_name(name.clone());
        }
        if let Some(stroke) = &config.stroke {
            self.set_stroke(stroke.clone());
        }
        if let Some(angle) = config.start_angle {
            self.set_start_angle(angle);
        }

        self.base.resume_signals_dispatching(true);
    }
}

impl Invalidatable for RadarAxis {
    fn invalidation(&self) -> &InvalidationState {
        self.base.invalidation()
    }

    fn invalidation_mut(&mut self) -> &mut InvalidationState {
        self.base.invalidation_mut()
    }
}

impl Drawable for RadarAxis {
    /// Draw what changed since the last call.
    ///
    /// Fails with [`ChartError::ScaleNotSet`] when no scale is attached and
    /// with [`ChartError::EmptyScale`] when the scale has no ticks. Dirty
    /// states are kept in both cases.
    fn draw(&mut self, surface: &mut Surface) -> ChartResult<()> {
        profile_function!();
        self.ensure_scale_relay();

        let data = match self.tick_data() {
            Ok(data) => data,
            Err(err) => {
                tracing::error!(axis = %self.name, %err, "cannot draw radar axis");
                return Err(err);
            }
        };

        match self.base.check_drawing_needed() {
            DrawDecision::Skip => return Ok(()),
            DrawDecision::Remove => {
                self.remove(surface);
                self.ticks
                    .invalidate(ConsistencyState::CONTAINER, Signal::empty());
                self.labels
                    .invalidate(ConsistencyState::CONTAINER, Signal::empty());
                tracing::debug!(axis = %self.name, "radar axis disabled");
                return Ok(());
            }
            DrawDecision::Proceed => {}
        }

        if data.ticks.is_empty() {
            tracing::error!(axis = %self.name, "cannot draw radar axis: scale has no ticks");
            return Err(ChartError::EmptyScale);
        }

        self.labels.suspend_signals_dispatching();
        self.ticks.suspend_signals_dispatching();

        let result = self.draw_passes(surface, &data);

        self.labels.resume_signals_dispatching(false);
        self.ticks.resume_signals_dispatching(false);
        result
    }

    fn remove(&mut self, surface: &mut Surface) {
        if let Some(line) = self.line {
            surface.set_parent(line, None);
        }
        self.ticks.remove(surface);
        self.labels.remove(surface);
    }
}

impl Boundable for RadarAxis {
    fn parent_bounds(&self) -> Option<Rect> {
        self.parent_bounds
    }

    /// Bounds are snapped to whole pixels.
    fn set_parent_bounds(&mut self, bounds: Option<Rect>) {
        let bounds = bounds.map(|b| b.round());
        if self.parent_bounds != bounds {
            self.parent_bounds = bounds;
            self.base.invalidate(ALL_VISUAL_STATES, REDRAW_AND_BOUNDS);
        }
    }

    /// Square occupied by the axis, ticks and labels included.
    fn pixel_bounds(&mut self) -> Rect {
        let Some(bounds) = self.parent_bounds else {
            return Rect::ZERO;
        };
        match self.current_layout() {
            Ok(layout) => layout.pixel_bounds(),
            Err(_) => RadialLayout::centered(bounds, self.start_angle).pixel_bounds(),
        }
    }
}
