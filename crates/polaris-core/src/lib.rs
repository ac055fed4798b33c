//! Polaris Core
//!
//! This crate contains the building blocks shared by every Polaris chart element:
//! - Consistency states and signals (the invalidation engine)
//! - Element identities
//! - Angle and pixel math
//! - Logging and profiling setup

pub mod alloc;
pub mod geometry;
pub mod id;
pub mod invalidation;
pub mod logging;
pub mod math;
pub mod profiling;

pub use geometry::Rect;
pub use id::ElementId;
pub use invalidation::{
    ConsistencyState, Invalidatable, InvalidationState, ListenerId, Signal, SignalEvent,
    SignalQueue, SignalTranslator,
};
