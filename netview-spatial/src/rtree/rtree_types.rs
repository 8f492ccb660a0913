//! Core types for the in-memory R-Tree.
//!
//! This module defines:
//! - Error and result types
//! - Entry, child reference and node types
//! - The canonical ordering key
//! - Statistics structures

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bounding_box::BoundingBox;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in spatial indexing operations
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("Invalid object key {0}: keys must be non-negative")]
    InvalidKey(ObjectKey),

    #[error("Object key {0} already exists in the tree")]
    DuplicateKey(ObjectKey),

    #[error("Invalid rectangle {0}: min must not exceed max on either axis")]
    InvalidRectangle(BoundingBox),

    #[error("Object key {0} not found")]
    NotFound(ObjectKey),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

/// Identifier of an indexed object. Only non-negative values are accepted.
pub type ObjectKey = i64;

/// Caller supplied value that positions an entry in the canonical order.
pub type OrderKey = f64;

/// Index of a node inside the tree's node arena
pub type NodeId = usize;

// ============================================================================
// Canonical Order
// ============================================================================

/// Position of an entry in the tree-wide enumeration order.
///
/// Compares by order key first (IEEE total order) and then by object key,
/// so any two distinct entries are strictly ordered.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalKey {
    pub order: OrderKey,
    pub id: ObjectKey,
}

impl CanonicalKey {
    pub fn new(order: OrderKey, id: ObjectKey) -> Self {
        Self { order, id }
    }
}

impl PartialEq for CanonicalKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CanonicalKey {}

impl PartialOrd for CanonicalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order
            .total_cmp(&other.order)
            .then(self.id.cmp(&other.id))
    }
}

// ============================================================================
// Node Types
// ============================================================================

/// Anything that occupies a rectangle inside a node.
pub(crate) trait Bounded {
    fn bbox(&self) -> &BoundingBox;
}

/// An entry in a leaf node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeafEntry {
    pub id: ObjectKey,
    pub bbox: BoundingBox,
    pub order: OrderKey,
}

impl LeafEntry {
    pub fn key(&self) -> CanonicalKey {
        CanonicalKey::new(self.order, self.id)
    }
}

impl Bounded for LeafEntry {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

/// A child reference in an internal node.
///
/// Besides the child's MBR it caches how many entries live below the child
/// and the first/last canonical keys among them. Queries use the count to
/// size results without walking fully covered subtrees, and the key range to
/// enumerate lazily in canonical order.
#[derive(Debug, Clone, Copy)]
pub struct ChildRef {
    pub bbox: BoundingBox,
    pub node: NodeId,
    pub count: usize,
    pub first: CanonicalKey,
    pub last: CanonicalKey,
}

impl Bounded for ChildRef {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

/// Node types in the R-Tree
#[derive(Debug, Clone)]
pub enum Node {
    /// Leaf node containing actual entries
    Leaf { entries: Vec<LeafEntry> },
    /// Internal node containing child references
    Internal { children: Vec<ChildRef> },
}

impl Default for Node {
    fn default() -> Self {
        Node::Leaf {
            entries: Vec::new(),
        }
    }
}

impl Node {
    /// Get the bounding box enclosing all children/entries
    pub fn compute_bbox(&self) -> BoundingBox {
        match self {
            Node::Leaf { entries } => compute_bbox(entries),
            Node::Internal { children } => compute_bbox(children),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            Node::Leaf { entries } => entries.len(),
            Node::Internal { children } => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn compute_bbox<T: Bounded>(items: &[T]) -> BoundingBox {
    items
        .iter()
        .fold(BoundingBox::empty(), |acc, item| acc.union(item.bbox()))
}

// ============================================================================
// Statistics
// ============================================================================

/// Structural statistics about an R-Tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RTreeStats {
    pub total_entries: u64,
    pub node_count: u64,
    pub leaf_count: u64,
    pub free_nodes: u64,
    pub tree_height: u32,
    pub branching_factor: u32,
    /// Average fill of non-root nodes relative to the branching factor (0-1)
    pub fill_factor: f64,
}
