//! Polaris Geometry - Incremental radial chart elements
//!
//! This crate provides:
//! - A retained drawing surface (layers, paths, text) that elements draw into
//! - Stroke, colour and path primitives
//! - Radar axes and radar grids that redraw only what changed (optional "chart" feature)
//!
//! # Example
//!
//! ```ignore
//! use polaris_geometry::chart::*;
//! use polaris_geometry::Surface;
//!
//! let mut surface = Surface::new();
//! let scale = OrdinalScale::from_names(["A", "B", "C", "D"]).into_handle();
//!
//! let mut axis = RadarAxis::new();
//! axis.set_scale(Some(scale));
//! axis.set_parent_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
//! axis.set_container(Some(surface.root()));
//! axis.draw(&mut surface)?;
//! ```

// Primitives
mod color;
mod path;
mod stroke;

// Scene
mod surface;

mod error;

#[cfg(feature = "chart")]
pub mod chart;

pub use color::*;
pub use error::*;
pub use path::*;
pub use stroke::*;
pub use surface::*;

pub use polaris_core::Rect;
