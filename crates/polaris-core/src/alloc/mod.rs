//! Collection types used across Polaris.
//!
//! This module provides:
//! - Re-exports of hash collections using AHash
//! - SparseSet, a generational arena handing out stable [`IndexSlot`]s

pub mod sparse_set;

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
pub use sparse_set::{IndexSlot, SparseSet};
