//! Tick marks drawn radially outwards from a circular axis.

use polaris_core::math::Vec2;
use polaris_core::{ConsistencyState, Invalidatable, InvalidationState, Signal};
use serde::{Deserialize, Serialize};

use crate::{Color, NodeId, Stroke, Surface};

/// Serializable tick settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicksSettings {
    pub enabled: bool,
    pub length: f32,
    pub stroke: Stroke,
}

impl Default for TicksSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            length: 5.0,
            stroke: Stroke::solid(Color::from_hex(0x313131), 1.0),
        }
    }
}

/// Renders all ticks of an axis into one path.
///
/// The owning axis calls [`draw`](Self::draw) once to reset the path and then
/// [`draw_tick`](Self::draw_tick) per tick with the final endpoints.
#[derive(Debug)]
pub struct RadialTicks {
    state: InvalidationState,
    settings: TicksSettings,
    container: Option<NodeId>,
    z_index: f32,
    path: Option<NodeId>,
}

impl Default for RadialTicks {
    fn default() -> Self {
        Self::new()
    }
}

impl RadialTicks {
    pub fn new() -> Self {
        Self::with_settings(TicksSettings::default())
    }

    pub fn with_settings(settings: TicksSettings) -> Self {
        Self {
            state: InvalidationState::new(
                ConsistencyState::VISUAL_BASE | ConsistencyState::APPEARANCE | ConsistencyState::BOUNDS,
                Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
            ),
            settings,
            container: None,
            z_index: 0.0,
            path: None,
        }
    }

    pub fn settings(&self) -> &TicksSettings {
        &self.settings
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.settings.enabled != enabled {
            self.settings.enabled = enabled;
            self.state.invalidate(
                ConsistencyState::ENABLED | ConsistencyState::BOUNDS,
                Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
            );
        }
    }

    pub fn length(&self) -> f32 {
        self.settings.length
    }

    pub fn set_length(&mut self, length: f32) {
        let length = if length.is_finite() { length } else { 0.0 };
        if self.settings.length != length {
            self.settings.length = length;
            self.state.invalidate(
                ConsistencyState::BOUNDS,
                Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
            );
        }
    }

    pub fn stroke(&self) -> &Stroke {
        &self.settings.stroke
    }

    pub fn set_stroke(&mut self, stroke: Stroke) {
        if self.settings.stroke != stroke {
            self.settings.stroke = stroke;
            self.state
                .invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);
        }
    }

    /// Replace every setting at once with a single broadcast.
    pub fn apply_settings(&mut self, settings: TicksSettings) {
        self.batch(|ticks| {
            ticks.set_enabled(settings.enabled);
            ticks.set_length(settings.length);
            ticks.set_stroke(settings.stroke);
        });
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    /// Takes effect on the next draw. Does not notify listeners.
    pub fn set_container(&mut self, container: Option<NodeId>) {
        if self.container != container {
            self.container = container;
            self.state
                .invalidate(ConsistencyState::CONTAINER, Signal::empty());
        }
    }

    pub fn set_z_index(&mut self, z_index: f32) {
        if self.z_index != z_index {
            self.z_index = z_index;
            self.state
                .invalidate(ConsistencyState::Z_INDEX, Signal::empty());
        }
    }

    /// The path holding all tick segments, once drawn.
    pub fn path(&self) -> Option<NodeId> {
        self.path
    }

    fn ensure_path(&mut self, surface: &mut Surface) -> NodeId {
        match self.path {
            Some(path) if surface.contains(path) => path,
            _ => {
                let path = surface.create_path();
                self.path = Some(path);
                path
            }
        }
    }

    /// Move the drawn path under the current container at the current z-index
    /// without touching its segments.
    pub fn apply_placement(&mut self, surface: &mut Surface) {
        let Some(path) = self.path.filter(|p| surface.contains(*p)) else {
            return;
        };
        self.place(surface, path);
        self.state
            .mark_consistent(ConsistencyState::CONTAINER | ConsistencyState::Z_INDEX);
    }

    fn place(&self, surface: &mut Surface, path: NodeId) {
        let parent = if self.settings.enabled {
            self.container
        } else {
            None
        };
        surface.set_parent(path, parent);
        surface.set_z_index(path, self.z_index);
    }

    /// Reset the tick path and apply stroke, container and z-index.
    pub fn draw(&mut self, surface: &mut Surface) {
        let path = self.ensure_path(surface);
        surface.clear_path(path);
        surface.set_stroke(path, Some(self.settings.stroke.clone()));
        self.place(surface, path);
        self.state.mark_consistent(ConsistencyState::all());
    }

    /// Append one tick segment. Ignored while disabled.
    pub fn draw_tick(&mut self, surface: &mut Surface, from: Vec2, to: Vec2) {
        if !self.settings.enabled {
            return;
        }
        if let Some(path) = self.path {
            surface.move_to(path, from);
            surface.line_to(path, to);
        }
    }

    pub fn remove(&mut self, surface: &mut Surface) {
        if let Some(path) = self.path {
            surface.set_parent(path, None);
        }
    }
}

impl Invalidatable for RadialTicks {
    fn invalidation(&self) -> &InvalidationState {
        &self.state
    }

    fn invalidation_mut(&mut self) -> &mut InvalidationState {
        &mut self.state
    }
}
