//! Overlap queries in canonical order.
//!
//! The enumerator keeps a frontier of pending subtrees and entries in a
//! binary heap. A subtree is keyed by the smallest canonical key below it
//! (largest when reversed), so popping the heap always yields either the
//! next entry in order or a subtree that must be opened before anything
//! else can be emitted. Only the part of the tree needed for the ids
//! consumed so far is ever visited.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::iter::FusedIterator;

use crate::bounding_box::BoundingBox;

use super::rtree_impl::RTree;
use super::rtree_types::{CanonicalKey, LeafEntry, Node, NodeId, ObjectKey};

#[derive(Debug)]
enum Target<'a> {
    Node(NodeId),
    Entry(&'a LeafEntry),
}

#[derive(Debug)]
struct Pending<'a> {
    key: CanonicalKey,
    reverse: bool,
    target: Target<'a>,
}

impl PartialEq for Pending<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending<'_> {}

impl PartialOrd for Pending<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending<'_> {
    // BinaryHeap pops the greatest item; forward order wants the smallest key.
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = self.key.cmp(&other.key);
        if self.reverse {
            ord
        } else {
            ord.reverse()
        }
    }
}

/// Lazy iterator over the keys whose extents intersect a query rectangle.
///
/// Keys are produced in canonical order (order key, then object key), or the
/// exact reverse. The number of pending results is known up front and
/// decreases by one per key returned. When created with an extents buffer,
/// the buffer always holds the bounding box of the keys returned so far,
/// starting from the inverted infinite rectangle.
///
/// The enumerator borrows the tree, so the tree cannot be changed while a
/// query is being consumed.
#[derive(Debug)]
pub struct OverlapEnumerator<'a> {
    tree: &'a RTree,
    query: BoundingBox,
    reverse: bool,
    frontier: BinaryHeap<Pending<'a>>,
    remaining: usize,
    extents: BoundingBox,
    extents_out: Option<&'a mut [f64; 4]>,
}

impl<'a> OverlapEnumerator<'a> {
    pub(crate) fn new(
        tree: &'a RTree,
        query: BoundingBox,
        mut extents_out: Option<&'a mut [f64; 4]>,
        reverse: bool,
    ) -> Self {
        let extents = BoundingBox::empty();
        if let Some(out) = extents_out.as_deref_mut() {
            extents.write_to(out);
        }

        let mut enumerator = Self {
            tree,
            query,
            reverse,
            frontier: BinaryHeap::new(),
            remaining: 0,
            extents,
            extents_out,
        };

        // An inverted or NaN query intersects nothing
        if query.is_valid() && !tree.entries.is_empty() {
            enumerator.remaining = tree.count_overlap(tree.root, &query);
            enumerator.expand(tree.root);
        }
        enumerator
    }

    /// Number of keys not yet returned.
    pub fn num_remaining(&self) -> usize {
        self.remaining
    }

    /// Bounding box of the keys returned so far.
    pub fn extents(&self) -> BoundingBox {
        self.extents
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Push the intersecting children or entries of a node onto the frontier.
    fn expand(&mut self, node_id: NodeId) {
        let tree = self.tree;
        let query = self.query;
        let reverse = self.reverse;

        match &tree.nodes[node_id] {
            Node::Leaf { entries } => {
                for entry in entries.iter().filter(|e| e.bbox.intersects(&query)) {
                    self.frontier.push(Pending {
                        key: entry.key(),
                        reverse,
                        target: Target::Entry(entry),
                    });
                }
            }
            Node::Internal { children } => {
                for child in children.iter().filter(|c| c.bbox.intersects(&query)) {
                    self.frontier.push(Pending {
                        key: if reverse { child.last } else { child.first },
                        reverse,
                        target: Target::Node(child.node),
                    });
                }
            }
        }
    }
}

impl Iterator for OverlapEnumerator<'_> {
    type Item = ObjectKey;

    fn next(&mut self) -> Option<ObjectKey> {
        while let Some(pending) = self.frontier.pop() {
            match pending.target {
                Target::Node(node_id) => self.expand(node_id),
                Target::Entry(entry) => {
                    self.remaining = self.remaining.saturating_sub(1);
                    self.extents.expand(&entry.bbox);
                    if let Some(out) = self.extents_out.as_deref_mut() {
                        self.extents.write_to(out);
                    }
                    return Some(entry.id);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for OverlapEnumerator<'_> {}

impl FusedIterator for OverlapEnumerator<'_> {}

impl RTree {
    /// Number of entries below `node_id` intersecting `query`.
    ///
    /// Subtrees lying entirely inside the query contribute their cached count.
    pub(super) fn count_overlap(&self, node_id: NodeId, query: &BoundingBox) -> usize {
        match &self.nodes[node_id] {
            Node::Leaf { entries } => entries.iter().filter(|e| e.bbox.intersects(query)).count(),
            Node::Internal { children } => children
                .iter()
                .filter(|c| c.bbox.intersects(query))
                .map(|c| {
                    if query.contains(&c.bbox) {
                        c.count
                    } else {
                        self.count_overlap(c.node, query)
                    }
                })
                .sum(),
        }
    }
}
