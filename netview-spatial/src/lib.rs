//! # NetView Spatial - Spatial Indexing for Interactive Network Views
//!
//! This crate provides the spatial index behind hit testing, rectangle
//! selection and visibility culling of large network drawings, along with an
//! ordered set of 64-bit keys.
//!
//! ## Features
//!
//! - **Dynamic R-Tree**: Quadratic splits, reinsert on underflow, root collapse
//! - **Stable Order**: Query results come sorted by a caller supplied order key
//! - **Lazy Queries**: Exact result counts up front, ids produced on demand
//! - **Snapshots**: Checksummed, fully validated binary encoding
//! - **Thread Safe Handle**: `SharedRTree` for use across threads
//! - **Ordered Key Set**: B-tree backed `OrderedLongSet` with range queries
//!
//! ## R-Tree API
//!
//! ```rust
//! use netview_spatial::{BoundingBox, RTree, SpatialIndex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tree = RTree::new(3)?;
//! tree.insert(0, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.0)?;
//! tree.insert(1, &BoundingBox::new(2.0, 2.0, 3.0, 3.0), 0.0)?;
//! tree.insert(2, &BoundingBox::new(0.5, 1.0, 1.5, 2.0), 0.0)?;
//!
//! // Query and collect the bounding box of the hits
//! let mut extents = [0.0; 4];
//! let hits: Vec<_> = tree
//!     .query_overlap(&BoundingBox::new(1.25, 2.0, 2.1, 3.3), Some(&mut extents), false)
//!     .collect();
//! assert_eq!(hits, vec![1, 2]);
//! assert_eq!(extents, [0.5, 1.0, 3.0, 3.0]);
//!
//! // Snapshot and restore
//! let restored = RTree::deserialize(&tree.serialize()?)?;
//! assert_eq!(restored.size(), 3);
//! # Ok(())
//! # }
//! ```

pub mod bounding_box;
pub mod ordered_long_set;
pub mod rtree;
pub mod shared;
pub mod spatial_index;

pub use bounding_box::BoundingBox;
pub use ordered_long_set::OrderedLongSet;
pub use rtree::{
    CanonicalKey, IntegrityReport, ObjectKey, OrderKey, OverlapEnumerator, RTree, RTreeConfig,
    RTreeStats, SpatialError, SpatialResult,
};
pub use shared::SharedRTree;
pub use spatial_index::SpatialIndex;
