//! Shared state and capabilities of visual chart elements.

use polaris_core::{ConsistencyState, Invalidatable, InvalidationState, Rect, Signal};

use crate::{ChartResult, NodeId, Surface};

/// Outcome of [`VisualBase::check_drawing_needed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawDecision {
    /// Nothing to do.
    Skip,
    /// The element was just disabled; its nodes must be detached.
    Remove,
    /// Continue with the dirty-state passes.
    Proceed,
}

/// Invalidation state plus the settings every visual element has.
#[derive(Debug)]
pub struct VisualBase {
    state: InvalidationState,
    enabled: bool,
    z_index: f32,
    container: Option<NodeId>,
}

impl VisualBase {
    /// `states` is added to [`ConsistencyState::VISUAL_BASE`].
    pub fn new(states: ConsistencyState, signals: Signal) -> Self {
        Self {
            state: InvalidationState::new(ConsistencyState::VISUAL_BASE | states, signals),
            enabled: true,
            z_index: 0.0,
            container: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.state.invalidate(
                ConsistencyState::ENABLED,
                Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
            );
        }
    }

    pub fn z_index(&self) -> f32 {
        self.z_index
    }

    pub fn set_z_index(&mut self, z_index: f32) {
        if self.z_index != z_index {
            self.z_index = z_index;
            self.state
                .invalidate(ConsistencyState::Z_INDEX, Signal::NEEDS_REDRAW);
        }
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn set_container(&mut self, container: Option<NodeId>) {
        if self.container != container {
            self.container = container;
            self.state.invalidate(
                ConsistencyState::CONTAINER | ConsistencyState::Z_INDEX,
                Signal::NEEDS_REDRAW,
            );
        }
    }

    /// Resolves the ENABLED state before a draw.
    ///
    /// A disabled element with a dirty ENABLED bit gets CONTAINER and its
    /// content states invalidated silently, so re-enabling it reattaches and
    /// redraws everything.
    pub fn check_drawing_needed(&mut self) -> DrawDecision {
        if self.state.is_consistent() {
            return DrawDecision::Skip;
        }

        if !self.enabled {
            if self
                .state
                .has_invalidation_state(ConsistencyState::ENABLED)
            {
                self.state.mark_consistent(ConsistencyState::ENABLED);
                self.state.invalidate(
                    ConsistencyState::CONTAINER
                        | ConsistencyState::TICKS
                        | ConsistencyState::LABELS,
                    Signal::empty(),
                );
                return DrawDecision::Remove;
            }
            return DrawDecision::Skip;
        }

        self.state.mark_consistent(ConsistencyState::ENABLED);
        DrawDecision::Proceed
    }
}

impl Invalidatable for VisualBase {
    fn invalidation(&self) -> &InvalidationState {
        &self.state
    }

    fn invalidation_mut(&mut self) -> &mut InvalidationState {
        &mut self.state
    }
}

/// An element that renders into a [`Surface`].
pub trait Drawable: Invalidatable {
    /// Run the passes for every dirty state. Consistent elements return
    /// immediately.
    fn draw(&mut self, surface: &mut Surface) -> ChartResult<()>;

    /// Detach every node this element owns.
    fn remove(&mut self, surface: &mut Surface);
}

/// An element laid out inside bounds given by its owner.
pub trait Boundable {
    fn parent_bounds(&self) -> Option<Rect>;

    fn set_parent_bounds(&mut self, bounds: Option<Rect>);

    /// Space used by the element.
    fn pixel_bounds(&mut self) -> Rect;
}
