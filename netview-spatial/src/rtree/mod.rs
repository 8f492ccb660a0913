//! In-memory R-Tree with canonical result ordering.
//!
//! This module provides a dynamic R-Tree designed for interactive views:
//! - Arena allocated nodes with quadratic splits
//! - Underflow handling by reinsertion and root collapse
//! - Lazy overlap queries returning keys sorted by order key
//! - Validated binary snapshots

pub mod rtree_types;
pub mod rtree_constants;
pub mod rtree_config;
pub mod persistence;
mod rtree_impl;
mod rtree_query;

pub use rtree_types::{
    CanonicalKey, ObjectKey, OrderKey, RTreeStats, SpatialError, SpatialResult,
};
pub use rtree_constants::DEFAULT_BRANCHING_FACTOR;
pub use rtree_config::RTreeConfig;
pub use rtree_impl::RTree;
pub use rtree_query::OverlapEnumerator;
pub use persistence::IntegrityReport;
