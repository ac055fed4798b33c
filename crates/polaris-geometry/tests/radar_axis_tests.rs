//! Radar axis drawing and invalidation against an in-memory surface.

use std::cell::RefCell;
use std::rc::Rc;

use polaris_geometry::chart::{
    ALL_VISUAL_STATES, Boundable, ConsistencyState, Drawable, Invalidatable, LabelPadding,
    OrdinalScale, RadarAxis, RadarAxisConfig, Rect, SignalQueue, TextMeasurer, Vec2,
};
use polaris_geometry::{ChartError, Color, PathCommand, Stroke, Surface};

/// "N" is 40x20, everything else 2x2.
struct TallNorth;

impl TextMeasurer for TallNorth {
    fn measure(&self, text: &str, _font_size: f32) -> Vec2 {
        if text == "N" {
            Vec2::new(40.0, 20.0)
        } else {
            Vec2::new(2.0, 2.0)
        }
    }
}

fn axis_with(surface: &Surface, names: &[&str]) -> RadarAxis {
    let mut axis = RadarAxis::new();
    axis.set_scale(Some(
        OrdinalScale::from_names(names.iter().copied()).into_handle(),
    ));
    axis.set_parent_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
    axis.set_container(Some(surface.root()));
    axis
}

#[test]
fn test_four_ticks_without_labels() {
    let mut surface = Surface::new();
    let mut axis = axis_with(&surface, &["a", "b", "c", "d"]);
    axis.update_labels(|labels| labels.set_enabled(false));
    axis.draw(&mut surface).unwrap();

    let layout = *axis.layout().expect("layout");
    assert_eq!(layout.center, Vec2::new(100.0, 100.0));
    assert!((layout.radius - 95.0).abs() <= 1.0);

    let line = surface.path(axis.line().expect("line")).expect("line path");
    assert_eq!(line.len(), 5);
    assert_eq!(
        line.commands()[0],
        PathCommand::MoveTo(Vec2::new(100.0, 100.0 - layout.radius))
    );
    assert_eq!(line.commands()[4], PathCommand::Close);

    let ticks = surface.path(axis.ticks().path().expect("ticks")).expect("tick path");
    assert_eq!(ticks.subpath_count(), 4);
    // Odd tick thickness at 270 degrees shifts half a pixel right.
    assert_eq!(
        ticks.commands()[0],
        PathCommand::MoveTo(Vec2::new(100.5, 100.0 - layout.radius))
    );
    assert_eq!(
        ticks.commands()[1],
        PathCommand::LineTo(Vec2::new(100.5, 100.0 - layout.radius - 5.0))
    );
    assert!(surface.attached_texts().is_empty());
}

#[test]
fn test_top_label_overflow_reduces_radius() {
    let mut surface = Surface::new();
    let mut axis = axis_with(&surface, &["N", "E", "S", "W"]);
    axis.update_labels(|labels| {
        labels.set_measurer(TallNorth);
        labels.set_padding(LabelPadding::ZERO);
    });
    axis.draw(&mut surface).unwrap();

    let deltas = axis.geometry().deltas();
    assert!(deltas.top > 0.0);
    assert_eq!(deltas.top, deltas.max());
    assert_eq!(axis.layout().map(|l| l.radius), Some(100.0 - deltas.top));

    let texts = surface.attached_texts();
    assert_eq!(texts.len(), 4);
    let north = texts.iter().find(|t| t.text == "N").expect("north label");
    assert!(north.bounds.top() >= 0.0);
    assert!(north.bounds.top() <= 1.0);
}

#[test]
fn test_draw_without_scale_keeps_state() {
    let mut surface = Surface::new();
    let mut axis = RadarAxis::new();
    axis.set_parent_bounds(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));

    assert_eq!(axis.draw(&mut surface), Err(ChartError::ScaleNotSet));
    assert!(axis.has_invalidation_state(ConsistencyState::BOUNDS));

    axis.set_scale(Some(OrdinalScale::from_names(["x", "y", "z"]).into_handle()));
    axis.draw(&mut surface).unwrap();
    assert!(axis.is_consistent());
}

#[test]
fn test_second_draw_is_idempotent() {
    let mut surface = Surface::new();
    let mut axis = axis_with(&surface, &["a", "b", "c", "d", "e"]);
    axis.draw(&mut surface).unwrap();

    let nodes = surface.node_count();
    let line = surface.path(axis.line().expect("line")).cloned();
    let texts: Vec<_> = surface.attached_texts().into_iter().cloned().collect();

    axis.draw(&mut surface).unwrap();
    assert_eq!(surface.node_count(), nodes);
    assert_eq!(surface.path(axis.line().expect("line")).cloned(), line);
    let again: Vec<_> = surface.attached_texts().into_iter().cloned().collect();
    assert_eq!(again, texts);
}

#[test]
fn test_disable_and_enable_cycle() {
    let mut surface = Surface::new();
    let mut axis = axis_with(&surface, &["a", "b", "c", "d"]);
    axis.draw(&mut surface).unwrap();

    let line = axis.line().expect("line");
    let ticks = axis.ticks().path().expect("ticks");
    assert!(surface.is_attached(line));
    assert_eq!(surface.attached_texts().len(), 4);

    axis.set_enabled(false);
    axis.draw(&mut surface).unwrap();
    assert!(!surface.is_attached(line));
    assert!(!surface.is_attached(ticks));
    assert!(surface.attached_texts().is_empty());

    axis.set_enabled(true);
    axis.draw(&mut surface).unwrap();
    assert!(surface.is_attached(line));
    assert!(surface.is_attached(ticks));
    assert_eq!(surface.attached_texts().len(), 4);
    assert!(axis.is_consistent());
}

#[test]
fn test_label_signals_translate_to_axis_states() {
    let mut surface = Surface::new();
    let mut axis = axis_with(&surface, &["a", "b", "c"]);
    axis.draw(&mut surface).unwrap();

    axis.update_labels(|labels| labels.set_color(Color::WHITE));
    assert!(axis.has_invalidation_state(ConsistencyState::LABELS));
    assert!(!axis.has_invalidation_state(ConsistencyState::BOUNDS));
    axis.draw(&mut surface).unwrap();

    axis.update_labels(|labels| labels.set_font_size(24.0));
    assert!(axis.has_invalidation_state(ALL_VISUAL_STATES));
    assert!(axis.geometry().label_bounds().is_empty());
}

#[test]
fn test_tick_signals_translate_to_axis_states() {
    let mut surface = Surface::new();
    let mut axis = axis_with(&surface, &["a", "b", "c"]);
    axis.draw(&mut surface).unwrap();

    axis.update_ticks(|ticks| ticks.set_stroke(Stroke::solid(Color::WHITE, 1.0)));
    assert!(axis.has_invalidation_state(ConsistencyState::TICKS));
    assert!(!axis.has_invalidation_state(ConsistencyState::BOUNDS));
    axis.draw(&mut surface).unwrap();

    axis.update_ticks(|ticks| ticks.set_length(12.0));
    assert!(axis.has_invalidation_state(ALL_VISUAL_STATES));
}

#[test]
fn test_scale_reapplication_redraws_every_tick() {
    let mut surface = Surface::new();
    let scale = std::rc::Rc::new(std::cell::RefCell::new(OrdinalScale::from_names([
        "a", "b", "c",
    ])));
    let mut axis = RadarAxis::new();
    axis.set_scale(Some(scale.clone()));
    axis.set_parent_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
    axis.set_container(Some(surface.root()));
    axis.draw(&mut surface).unwrap();

    scale.borrow_mut().set_names(["a", "b", "c", "d", "e", "f"]);
    axis.draw(&mut surface).unwrap();

    let ticks = surface.path(axis.ticks().path().expect("ticks")).expect("tick path");
    assert_eq!(ticks.subpath_count(), 6);
    assert_eq!(surface.attached_texts().len(), 6);
}

#[test]
fn test_shared_scale_change_is_visible_immediately() {
    let mut surface = Surface::new();
    let scale = Rc::new(RefCell::new(OrdinalScale::from_names(["a", "b", "c"])));
    let mut axis = RadarAxis::new();
    axis.set_scale(Some(scale.clone()));
    axis.set_parent_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
    axis.set_container(Some(surface.root()));
    axis.draw(&mut surface).unwrap();
    assert!(axis.layout().is_some());

    let queue = SignalQueue::new();
    axis.listen_signals(&queue);
    scale.borrow_mut().set_names(["a", "b", "c", "d"]);

    assert!(axis.has_invalidation_state(ALL_VISUAL_STATES));
    assert!(!axis.is_consistent());
    assert!(axis.layout().is_none());
    assert_eq!(queue.len(), 1);

    // the axis is already dirty, so nothing new is announced
    scale.borrow_mut().set_names(["a", "b"]);
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_scale_attached_while_borrowed_is_kept() {
    let mut surface = Surface::new();
    let scale = Rc::new(RefCell::new(OrdinalScale::from_names(["a", "b", "c"])));
    let mut axis = RadarAxis::new();
    axis.set_parent_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
    axis.set_container(Some(surface.root()));
    {
        let _editing = scale.borrow_mut();
        axis.set_scale(Some(scale.clone()));
    }
    assert!(axis.scale().is_some());

    axis.draw(&mut surface).unwrap();
    assert!(axis.is_consistent());

    scale.borrow_mut().set_names(["a", "b", "c", "d"]);
    assert!(axis.has_invalidation_state(ConsistencyState::BOUNDS));
    axis.draw(&mut surface).unwrap();
    assert_eq!(axis.layout().map(|l| l.tick_count), Some(4));
}

#[test]
fn test_label_boxes_dropped_once_per_refit() {
    let mut surface = Surface::new();
    let scale = Rc::new(RefCell::new(OrdinalScale::from_names(["N", "E", "S", "W"])));
    let mut axis = RadarAxis::new();
    axis.set_scale(Some(scale.clone()));
    axis.set_parent_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
    axis.set_container(Some(surface.root()));
    axis.update_labels(|labels| {
        labels.set_measurer(TallNorth);
        labels.set_padding(LabelPadding::ZERO);
    });

    let before = axis.geometry().label_bounds().invalidation_count();
    axis.draw(&mut surface).unwrap();
    assert!(axis.geometry().deltas().top > 0.0);
    assert_eq!(axis.geometry().label_bounds().invalidation_count(), before + 1);

    scale.borrow_mut().set_names(["N", "E", "S", "W", "X"]);
    axis.draw(&mut surface).unwrap();
    assert_eq!(axis.geometry().label_bounds().invalidation_count(), before + 2);

    // nothing dirty, nothing refitted
    axis.draw(&mut surface).unwrap();
    assert_eq!(axis.geometry().label_bounds().invalidation_count(), before + 2);
}

#[test]
fn test_deserialize_broadcasts_once() {
    let mut surface = Surface::new();
    let mut axis = axis_with(&surface, &["a", "b", "c"]);
    axis.draw(&mut surface).unwrap();

    let queue = SignalQueue::new();
    axis.listen_signals(&queue);

    let mut config = axis.serialize();
    config.name = Some("renamed".to_string());
    config.start_angle = Some(45.0);
    config.z_index = Some(3.0);
    config.stroke = Some(Stroke::solid(Color::BLACK, 3.0));
    if let Some(ticks) = config.ticks.as_mut() {
        ticks.length = 9.0;
    }
    axis.deserialize(&config);

    assert_eq!(queue.len(), 1);
    assert_eq!(axis.name(), "renamed");
    assert_eq!(axis.start_angle(), 45.0);
    assert_eq!(axis.ticks().length(), 9.0);
}

#[test]
fn test_config_survives_json() {
    let mut axis = RadarAxis::new();
    axis.set_name("speed");
    axis.set_start_angle(30.0);
    axis.update_labels(|labels| labels.set_font_size(14.0));

    let json = axis.serialize().to_json().unwrap();
    let mut copy = RadarAxis::new();
    copy.deserialize(&RadarAxisConfig::from_json(&json).unwrap());
    assert_eq!(copy.serialize(), axis.serialize());
}

#[test]
fn test_remaining_bounds_sit_inside_the_circle() {
    let surface = Surface::new();
    let mut axis = axis_with(&surface, &["a", "b", "c", "d"]);
    let remaining = axis.get_remaining_bounds();
    let pixel = axis.pixel_bounds();

    assert!(pixel.contains_rect(&remaining));
    assert!(remaining.width > 0.0);
    assert_eq!(remaining.center(), Vec2::new(100.0, 100.0));
}
