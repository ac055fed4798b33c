//! Radar chart elements.
//!
//! Provides incrementally redrawn elements for radar (polar) charts:
//! - [`RadarAxis`]: circular axis with ticks and labels
//! - [`RadarGrid`]: concentric rings or radial spokes with interlaced bands
//!
//! # Features
//!
//! - **Dirty states**: every setter marks only the aspects it affects, and a
//!   draw recomputes only those
//! - **Signals**: elements report changes to [`SignalQueue`] mailboxes
//!   and relay child and scale changes into their own states before the
//!   mutating call returns, collapsed into one event while batched
//! - **Bounds fitting**: axes shrink until ticks and labels fit their bounds
//! - **Configuration**: every element serializes to and from JSON
//!
//! # Example
//!
//! ```ignore
//! use polaris_geometry::chart::*;
//! use polaris_geometry::Surface;
//!
//! let mut surface = Surface::new();
//! let names = OrdinalScale::from_names(["speed", "power", "range"]).into_handle();
//! let values = LinearScale::new(0.0, 10.0).into_handle();
//!
//! let mut grid = RadarGrid::new();
//! grid.set_x_scale(Some(names.clone()));
//! grid.set_y_scale(Some(values));
//!
//! let mut axis = RadarAxis::new();
//! axis.set_scale(Some(names));
//! axis.set_parent_bounds(Some(Rect::new(0.0, 0.0, 400.0, 300.0)));
//! axis.set_container(Some(surface.root()));
//!
//! grid.set_parent_bounds(Some(axis.get_remaining_bounds()));
//! grid.set_container(Some(surface.root()));
//!
//! grid.draw(&mut surface)?;
//! axis.draw(&mut surface)?;
//! ```

mod config;
mod element;
mod labels;
mod measure;
mod radar_axis;
mod radar_grid;
pub mod radial;
mod scale;
mod ticks;
mod typed_layer;

pub use config::*;
pub use element::*;
pub use labels::*;
pub use measure::*;
pub use radar_axis::*;
pub use radar_grid::*;
pub use radial::{
    FitParams, FitResult, GeometryCache, LabelBoundsCache, RadialLayout, SideDeltas,
    fit_radial_layout, label_offset_for_angle,
};
pub use scale::*;
pub use ticks::*;
pub use typed_layer::*;

pub use polaris_core::math::Vec2;
pub use polaris_core::{ConsistencyState, Invalidatable, Rect, Signal, SignalEvent, SignalQueue};
