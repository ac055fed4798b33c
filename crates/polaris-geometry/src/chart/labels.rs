//! Label measurement, queueing and drawing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use polaris_core::alloc::HashMap;
use polaris_core::math::Vec2;
use polaris_core::{ConsistencyState, Invalidatable, InvalidationState, Rect, Signal};
use serde::{Deserialize, Serialize};

use super::measure::{HeuristicTextMeasurer, TextMeasurer};
use crate::{Color, NodeId, Surface, TextNode};

/// Memoized text sizes kept before the memo starts over.
const MAX_MEMOIZED_SIZES: usize = 256;

/// Values available to a label formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelContext {
    pub index: usize,
    /// Category name for ordinal scales, otherwise the formatted tick value.
    pub value: String,
    pub tick_value: f64,
    pub axis_name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Turns a [`LabelContext`] into label text.
pub type LabelFormatter = Rc<dyn Fn(&LabelContext) -> String>;

fn default_format(ctx: &LabelContext) -> String {
    ctx.value.clone()
}

/// Space between the text and the label box edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelPadding {
    pub horizontal: f32,
    pub vertical: f32,
}

impl LabelPadding {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

impl Default for LabelPadding {
    fn default() -> Self {
        Self::new(2.0, 1.0)
    }
}

/// Serializable label settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsSettings {
    pub enabled: bool,
    pub font_size: f32,
    pub padding: LabelPadding,
    pub color: Color,
}

impl Default for LabelsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            font_size: 11.0,
            padding: LabelPadding::default(),
            color: Color::from_rgba_u8(34, 34, 34, 255),
        }
    }
}

#[derive(Debug, Clone)]
struct QueuedLabel {
    text: String,
    bounds: Rect,
}

/// Measures, queues and draws the labels of one element.
///
/// Labels are queued with [`add`](Self::add) during a draw pass and turned
/// into text nodes by [`draw`](Self::draw). Text nodes are reused between
/// draws.
pub struct LabelsFactory {
    state: InvalidationState,
    settings: LabelsSettings,
    formatter: LabelFormatter,
    measurer: Rc<dyn TextMeasurer>,
    /// Unpadded text sizes at the current font size.
    sizes: RefCell<HashMap<String, Vec2>>,
    container: Option<NodeId>,
    z_index: f32,
    parent_bounds: Option<Rect>,
    queue: Vec<QueuedLabel>,
    layer: Option<NodeId>,
    texts: Vec<NodeId>,
}

impl fmt::Debug for LabelsFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelsFactory")
            .field("settings", &self.settings)
            .field("container", &self.container)
            .field("z_index", &self.z_index)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Default for LabelsFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelsFactory {
    pub fn new() -> Self {
        Self::with_settings(LabelsSettings::default())
    }

    pub fn with_settings(settings: LabelsSettings) -> Self {
        Self {
            state: InvalidationState::new(
                ConsistencyState::VISUAL_BASE | ConsistencyState::BOUNDS | ConsistencyState::APPEARANCE,
                Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
            ),
            settings,
            formatter: Rc::new(default_format),
            measurer: Rc::new(HeuristicTextMeasurer),
            sizes: RefCell::new(HashMap::new()),
            container: None,
            z_index: 0.0,
            parent_bounds: None,
            queue: Vec::new(),
            layer: None,
            texts: Vec::new(),
        }
    }

    pub fn settings(&self) -> &LabelsSettings {
        &self.settings
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    fn invalidate_geometry(&mut self) {
        self.sizes.get_mut().clear();
        self.state.invalidate(
            ConsistencyState::BOUNDS,
            Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
        );
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.settings.enabled != enabled {
            self.settings.enabled = enabled;
            self.invalidate_geometry();
        }
    }

    pub fn font_size(&self) -> f32 {
        self.settings.font_size
    }

    pub fn set_font_size(&mut self, font_size: f32) {
        if self.settings.font_size != font_size {
            self.settings.font_size = font_size;
            self.invalidate_geometry();
        }
    }

    pub fn padding(&self) -> LabelPadding {
        self.settings.padding
    }

    pub fn set_padding(&mut self, padding: LabelPadding) {
        if self.settings.padding != padding {
            self.settings.padding = padding;
            self.invalidate_geometry();
        }
    }

    pub fn color(&self) -> Color {
        self.settings.color
    }

    /// Colour does not move labels, so listeners only get `NEEDS_REDRAW`.
    pub fn set_color(&mut self, color: Color) {
        if self.settings.color != color {
            self.settings.color = color;
            self.state
                .invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);
        }
    }

    pub fn set_formatter(&mut self, formatter: impl Fn(&LabelContext) -> String + 'static) {
        self.formatter = Rc::new(formatter);
        self.invalidate_geometry();
    }

    pub fn set_measurer(&mut self, measurer: impl TextMeasurer + 'static) {
        self.measurer = Rc::new(measurer);
        self.invalidate_geometry();
    }

    /// Replace every serializable setting with a single broadcast.
    pub fn apply_settings(&mut self, settings: LabelsSettings) {
        self.batch(|labels| {
            labels.set_enabled(settings.enabled);
            labels.set_font_size(settings.font_size);
            labels.set_padding(settings.padding);
            labels.set_color(settings.color);
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

    pub fn parent_bounds(&self) -> Option<Rect> {
        self.parent_bounds
    }

    /// Bounds labels are laid out in. Does not notify listeners.
    pub fn set_parent_bounds(&mut self, bounds: Option<Rect>) {
        self.parent_bounds = bounds;
    }

    pub fn format(&self, ctx: &LabelContext) -> String {
        (self.formatter)(ctx)
    }

    /// Box of the label for `ctx`, centered on `position`, padding included.
    pub fn measure(&self, ctx: &LabelContext, position: Vec2) -> Rect {
        let text = self.format(ctx);
        self.measure_text(&text, position)
    }

    fn measure_text(&self, text: &str, position: Vec2) -> Rect {
        let mut sizes = self.sizes.borrow_mut();
        let size = match sizes.get(text) {
            Some(size) => *size,
            None => {
                if sizes.len() >= MAX_MEMOIZED_SIZES {
                    sizes.clear();
                }
                let size = self.measurer.measure(text, self.settings.font_size);
                sizes.insert(text.to_string(), size);
                size
            }
        };
        let padding = self.settings.padding;
        let size = Vec2::new(
            size.x + padding.horizontal * 2.0,
            size.y + padding.vertical * 2.0,
        );
        Rect::from_center_size(position, size)
    }

    /// Queue a label centered on `position`.
    pub fn add(&mut self, ctx: &LabelContext, position: Vec2) {
        let text = self.format(ctx);
        let bounds = self.measure_text(&text, position);
        self.queue.push(QueuedLabel { text, bounds });
    }

    /// Drop every queued label.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Text nodes currently owned by the factory.
    pub fn text_nodes(&self) -> &[NodeId] {
        &self.texts
    }

    fn ensure_layer(&mut self, surface: &mut Surface) -> NodeId {
        match self.layer {
            Some(layer) if surface.contains(layer) => layer,
            _ => {
                let layer = surface.create_layer();
                self.layer = Some(layer);
                self.texts.clear();
                layer
            }
        }
    }

    fn place(&self, surface: &mut Surface, layer: NodeId) {
        let parent = if self.settings.enabled {
            self.container
        } else {
            None
        };
        surface.set_parent(layer, parent);
        surface.set_z_index(layer, self.z_index);
    }

    /// Move already drawn labels under the current container at the current
    /// z-index.
    pub fn apply_placement(&mut self, surface: &mut Surface) {
        let Some(layer) = self.layer.filter(|l| surface.contains(*l)) else {
            return;
        };
        self.place(surface, layer);
        self.state
            .mark_consistent(ConsistencyState::CONTAINER | ConsistencyState::Z_INDEX);
    }

    /// Turn the queue into text nodes.
    pub fn draw(&mut self, surface: &mut Surface) {
        let layer = self.ensure_layer(surface);
        self.place(surface, layer);
        surface.set_clip(layer, self.parent_bounds);

        let wanted = if self.settings.enabled {
            self.queue.len()
        } else {
            0
        };
        while self.texts.len() > wanted {
            if let Some(node) = self.texts.pop() {
                surface.remove(node);
            }
        }

        for (i, label) in self.queue.iter().take(wanted).enumerate() {
            let text = TextNode {
                text: label.text.clone(),
                bounds: label.bounds,
                color: self.settings.color,
                font_size: self.settings.font_size,
            };
            match self.texts.get(i) {
                Some(&node) => surface.set_text(node, text),
                None => {
                    let node = surface.create_text(text);
                    surface.set_parent(node, Some(layer));
                    self.texts.push(node);
                }
            }
        }

        tracing::trace!(labels = wanted, "labels drawn");
        self.state.mark_consistent(ConsistencyState::all());
    }

    pub fn remove(&mut self, surface: &mut Surface) {
        if let Some(layer) = self.layer {
            surface.set_parent(layer, None);
        }
    }
}

impl Invalidatable for LabelsFactory {
    fn invalidation(&self) -> &InvalidationState {
        &self.state
    }

    fn invalidation_mut(&mut self) -> &mut InvalidationState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polaris_core::SignalQueue;

    struct FixedMeasurer(Vec2);

    impl TextMeasurer for FixedMeasurer {
        fn measure(&self, _text: &str, _font_size: f32) -> Vec2 {
            self.0
        }
    }

    fn ctx(index: usize, value: &str) -> LabelContext {
        LabelContext {
            index,
            value: value.to_string(),
            tick_value: index as f64,
            axis_name: "axis".to_string(),
            min: None,
            max: None,
        }
    }

    #[test]
    fn test_measure_is_centered_with_padding() {
        let mut labels = LabelsFactory::new();
        labels.set_measurer(FixedMeasurer(Vec2::new(36.0, 18.0)));
        let rect = labels.measure(&ctx(0, "x"), Vec2::new(100.0, 50.0));
        assert_eq!(rect, Rect::new(80.0, 40.0, 40.0, 20.0));
    }

    #[test]
    fn test_font_size_change_remeasures() {
        let mut labels = LabelsFactory::new();
        labels.set_padding(LabelPadding::ZERO);
        let small = labels.measure(&ctx(0, "abcd"), Vec2::ZERO);
        assert_eq!(small.width, 0.6 * 11.0 * 4.0);

        labels.set_font_size(20.0);
        let large = labels.measure(&ctx(0, "abcd"), Vec2::ZERO);
        assert_eq!(large.size(), Vec2::new(0.6 * 20.0 * 4.0, 20.0));
    }

    #[test]
    fn test_size_memo_is_bounded() {
        let labels = LabelsFactory::new();
        for i in 0..MAX_MEMOIZED_SIZES * 3 {
            labels.measure(&ctx(i, &format!("tick {i}")), Vec2::ZERO);
        }
        assert!(labels.sizes.borrow().len() <= MAX_MEMOIZED_SIZES);

        // a memo restart does not change the answer
        let before = labels.measure(&ctx(0, "tick 0"), Vec2::ZERO);
        labels.sizes.borrow_mut().clear();
        assert_eq!(labels.measure(&ctx(0, "tick 0"), Vec2::ZERO), before);
    }

    #[test]
    fn test_formatter_controls_text() {
        let mut labels = LabelsFactory::new();
        labels.set_formatter(|ctx| format!("{}#{}", ctx.axis_name, ctx.index));
        assert_eq!(labels.format(&ctx(3, "ignored")), "axis#3");
    }

    #[test]
    fn test_draw_reuses_text_nodes() {
        let mut surface = Surface::new();
        let mut labels = LabelsFactory::new();
        labels.set_container(Some(surface.root()));

        labels.add(&ctx(0, "a"), Vec2::ZERO);
        labels.add(&ctx(1, "b"), Vec2::ZERO);
        labels.draw(&mut surface);
        let first = labels.text_nodes().to_vec();
        assert_eq!(first.len(), 2);
        assert_eq!(surface.attached_texts().len(), 2);

        labels.clear();
        labels.add(&ctx(0, "c"), Vec2::ZERO);
        labels.draw(&mut surface);
        assert_eq!(labels.text_nodes(), &first[..1]);
        assert_eq!(surface.attached_texts()[0].text, "c");
        assert!(!surface.contains(first[1]));
    }

    #[test]
    fn test_disabled_labels_draw_nothing() {
        let mut surface = Surface::new();
        let mut labels = LabelsFactory::new();
        labels.set_container(Some(surface.root()));
        labels.set_enabled(false);
        labels.add(&ctx(0, "a"), Vec2::ZERO);
        labels.draw(&mut surface);
        assert!(surface.attached_texts().is_empty());
    }

    #[test]
    fn test_signals_distinguish_geometry_from_colour() {
        let mut surface = Surface::new();
        let mut labels = LabelsFactory::new();
        labels.draw(&mut surface);
        let queue = SignalQueue::new();
        labels.listen_signals(&queue);

        labels.set_color(Color::WHITE);
        assert_eq!(queue.pop().map(|e| e.signals), Some(Signal::NEEDS_REDRAW));

        labels.set_font_size(20.0);
        assert_eq!(
            queue.pop().map(|e| e.signals),
            Some(Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED)
        );
    }

    #[test]
    fn test_container_change_is_silent() {
        let mut surface = Surface::new();
        let mut labels = LabelsFactory::new();
        labels.draw(&mut surface);
        let queue = SignalQueue::new();
        labels.listen_signals(&queue);

        labels.set_container(Some(surface.root()));
        assert!(queue.is_empty());
        assert!(labels.has_invalidation_state(ConsistencyState::CONTAINER));
    }
}
