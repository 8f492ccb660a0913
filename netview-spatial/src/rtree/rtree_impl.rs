//! RTree implementation.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::{debug, trace};

use crate::bounding_box::BoundingBox;
use crate::spatial_index::SpatialIndex;

use super::rtree_config::RTreeConfig;
use super::rtree_query::OverlapEnumerator;
use super::rtree_types::{
    compute_bbox, Bounded, ChildRef, LeafEntry, Node, NodeId, ObjectKey, OrderKey, RTreeStats,
    SpatialError, SpatialResult,
};

/// A dynamic in-memory R-Tree mapping object keys to rectangles.
///
/// Nodes live in an arena and refer to each other by index. Every entry also
/// carries an order key; overlap queries return keys sorted by
/// `(order key, object key)` no matter which part of the tree they come from,
/// so a result can be used directly as paint or pick order.
///
/// The tree is not synchronized. Wrap it in a [`SharedRTree`](crate::SharedRTree)
/// or another lock when several threads need it.
///
/// # Example
/// ```rust
/// use netview_spatial::{BoundingBox, RTree, SpatialIndex};
///
/// let mut tree = RTree::new(3).expect("valid branching factor");
/// tree.insert(0, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.0).unwrap();
/// tree.insert(1, &BoundingBox::new(2.0, 2.0, 3.0, 3.0), 0.0).unwrap();
///
/// let mut extents = [0.0; 4];
/// let hits: Vec<_> = tree
///     .query_overlap(&BoundingBox::new(0.5, 0.5, 2.0, 2.0), Some(&mut extents), false)
///     .collect();
/// assert_eq!(hits, vec![0, 1]);
/// assert_eq!(extents, [0.0, 0.0, 3.0, 3.0]);
/// ```
#[derive(Debug, Clone)]
pub struct RTree {
    pub(super) config: RTreeConfig,
    pub(super) nodes: Vec<Node>,
    /// Arena slots released by deletes, reused before growing the arena
    pub(super) free_nodes: Vec<NodeId>,
    pub(super) root: NodeId,
    /// Edges between the root and the leaves
    pub(super) height: usize,
    pub(super) entries: HashMap<ObjectKey, LeafEntry>,
}

impl Default for RTree {
    fn default() -> Self {
        Self::empty_with(RTreeConfig::default())
    }
}

impl RTree {
    /// Create an empty tree with the given branching factor (at least 2).
    pub fn new(branching_factor: usize) -> SpatialResult<Self> {
        Self::with_config(RTreeConfig::new(branching_factor))
    }

    /// Create an empty tree with explicit node capacity settings.
    pub fn with_config(config: RTreeConfig) -> SpatialResult<Self> {
        config.validate()?;
        Ok(Self::empty_with(config))
    }

    pub(super) fn empty_with(config: RTreeConfig) -> Self {
        Self {
            config,
            nodes: vec![Node::default()],
            free_nodes: Vec::new(),
            root: 0,
            height: 0,
            entries: HashMap::new(),
        }
    }

    pub fn config(&self) -> RTreeConfig {
        self.config
    }

    /// Distance from the root to the leaves; 0 while the root is a leaf.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extents of `id`, if indexed.
    pub fn extents(&self, id: ObjectKey) -> Option<BoundingBox> {
        self.entries.get(&id).map(|entry| entry.bbox)
    }

    /// Order key `id` was inserted with, if indexed.
    pub fn order_key(&self, id: ObjectKey) -> Option<OrderKey> {
        self.entries.get(&id).map(|entry| entry.order)
    }

    /// Bounding box of everything in the tree, or the empty box.
    pub fn bounds(&self) -> BoundingBox {
        self.nodes[self.root].compute_bbox()
    }

    /// All keys in canonical order.
    pub fn iter(&self) -> OverlapEnumerator<'_> {
        self.query_overlap(&BoundingBox::infinite(), None, false)
    }

    /// Get structural statistics
    pub fn stats(&self) -> RTreeStats {
        let mut node_count = 0u64;
        let mut leaf_count = 0u64;
        let mut non_root_nodes = 0usize;
        let mut non_root_items = 0usize;

        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id];
            node_count += 1;
            if node_id != self.root {
                non_root_nodes += 1;
                non_root_items += node.len();
            }
            match node {
                Node::Leaf { .. } => leaf_count += 1,
                Node::Internal { children } => stack.extend(children.iter().map(|c| c.node)),
            }
        }

        let fill_factor = if non_root_nodes > 0 {
            non_root_items as f64 / (non_root_nodes * self.config.branching_factor()) as f64
        } else {
            0.0
        };

        RTreeStats {
            total_entries: self.entries.len() as u64,
            node_count,
            leaf_count,
            free_nodes: self.free_nodes.len() as u64,
            tree_height: self.height as u32,
            branching_factor: self.config.branching_factor() as u32,
            fill_factor,
        }
    }

    /// Summary of a node as seen from its parent.
    pub(super) fn summarize(&self, node_id: NodeId) -> ChildRef {
        match &self.nodes[node_id] {
            Node::Leaf { entries } => ChildRef {
                bbox: compute_bbox(entries),
                node: node_id,
                count: entries.len(),
                first: entries.iter().map(LeafEntry::key).min().unwrap_or_default(),
                last: entries.iter().map(LeafEntry::key).max().unwrap_or_default(),
            },
            Node::Internal { children } => ChildRef {
                bbox: compute_bbox(children),
                node: node_id,
                count: children.iter().map(|c| c.count).sum(),
                first: children.iter().map(|c| c.first).min().unwrap_or_default(),
                last: children.iter().map(|c| c.last).max().unwrap_or_default(),
            },
        }
    }

    pub(super) fn allocate(&mut self, node: Node) -> NodeId {
        match self.free_nodes.pop() {
            Some(node_id) => {
                self.nodes[node_id] = node;
                node_id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Insert an entry below the root, growing a new root if the old one splits.
    fn insert_entry(&mut self, entry: LeafEntry) {
        if let Some(sibling) = self.insert_at(self.root, entry) {
            let old_root = self.root;
            let children = vec![self.summarize(old_root), self.summarize(sibling)];
            self.root = self.allocate(Node::Internal { children });
            self.height += 1;
            debug!("Root split, tree height is now {}", self.height);
        }
    }

    /// Insert below `node_id`; returns the new sibling if the node split.
    fn insert_at(&mut self, node_id: NodeId, entry: LeafEntry) -> Option<NodeId> {
        let descend = match &mut self.nodes[node_id] {
            Node::Leaf { entries } => {
                entries.push(entry);
                None
            }
            Node::Internal { children } => {
                let slot = choose_subtree(children, &entry.bbox);
                Some((slot, children[slot].node))
            }
        };

        if let Some((slot, child_id)) = descend {
            let split = self.insert_at(child_id, entry);
            let refreshed = self.summarize(child_id);
            let sibling = split.map(|sibling_id| self.summarize(sibling_id));
            if let Node::Internal { children } = &mut self.nodes[node_id] {
                children[slot] = refreshed;
                children.extend(sibling);
            }
        }

        if self.nodes[node_id].len() > self.config.branching_factor() {
            Some(self.split_node(node_id))
        } else {
            None
        }
    }

    /// Split an overflowing node in two and return the new node.
    fn split_node(&mut self, node_id: NodeId) -> NodeId {
        let min_fill = self.config.min_fill();
        let sibling = match &mut self.nodes[node_id] {
            Node::Leaf { entries } => {
                let (keep, moved) = quadratic_split(std::mem::take(entries), min_fill);
                *entries = keep;
                Node::Leaf { entries: moved }
            }
            Node::Internal { children } => {
                let (keep, moved) = quadratic_split(std::mem::take(children), min_fill);
                *children = keep;
                Node::Internal { children: moved }
            }
        };
        self.allocate(sibling)
    }

    /// Remove `target` from the subtree at `node_id`.
    ///
    /// Children left underfull are detached and their entries pushed to
    /// `orphans`. Returns false, without touching anything, if the entry is
    /// not in this subtree.
    fn remove_at(
        &mut self,
        node_id: NodeId,
        target: &LeafEntry,
        orphans: &mut Vec<LeafEntry>,
    ) -> bool {
        let candidates: Vec<(usize, NodeId)> = match &mut self.nodes[node_id] {
            Node::Leaf { entries } => {
                return match entries.iter().position(|e| e.id == target.id) {
                    Some(pos) => {
                        entries.remove(pos);
                        true
                    }
                    None => false,
                };
            }
            Node::Internal { children } => children
                .iter()
                .enumerate()
                .filter(|(_, child)| child.bbox.contains(&target.bbox))
                .map(|(slot, child)| (slot, child.node))
                .collect(),
        };

        for (slot, child_id) in candidates {
            if !self.remove_at(child_id, target, orphans) {
                continue;
            }

            if self.nodes[child_id].len() < self.config.min_fill() {
                self.release_subtree(child_id, orphans);
                if let Node::Internal { children } = &mut self.nodes[node_id] {
                    children.remove(slot);
                }
            } else {
                let refreshed = self.summarize(child_id);
                if let Node::Internal { children } = &mut self.nodes[node_id] {
                    children[slot] = refreshed;
                }
            }
            return true;
        }
        false
    }

    /// Free every node of a subtree, collecting its entries.
    fn release_subtree(&mut self, node_id: NodeId, orphans: &mut Vec<LeafEntry>) {
        let node = std::mem::take(&mut self.nodes[node_id]);
        self.free_nodes.push(node_id);
        match node {
            Node::Leaf { entries } => orphans.extend(entries),
            Node::Internal { children } => {
                for child in children {
                    self.release_subtree(child.node, orphans);
                }
            }
        }
    }

    /// Replace an internal root that has a single child by that child.
    ///
    /// An internal root left without children becomes an empty leaf.
    fn collapse_root(&mut self) {
        loop {
            let only_child = match &self.nodes[self.root] {
                Node::Internal { children } => match children.as_slice() {
                    [] => None,
                    [only] => Some(only.node),
                    _ => break,
                },
                Node::Leaf { .. } => break,
            };
            let Some(only_child) = only_child else {
                self.nodes[self.root] = Node::default();
                self.height = 0;
                debug!("Root lost all children, tree reset to an empty leaf");
                break;
            };
            let old_root = self.root;
            self.nodes[old_root] = Node::default();
            self.free_nodes.push(old_root);
            self.root = only_child;
            self.height -= 1;
            debug!("Root collapsed, tree height is now {}", self.height);
        }
    }
}

// ============================================================================
// SpatialIndex Trait Implementation
// ============================================================================

impl SpatialIndex for RTree {
    fn insert(
        &mut self,
        id: ObjectKey,
        rect: &BoundingBox,
        order_key: OrderKey,
    ) -> SpatialResult<()> {
        if id < 0 {
            return Err(SpatialError::InvalidKey(id));
        }
        if self.entries.contains_key(&id) {
            return Err(SpatialError::DuplicateKey(id));
        }
        if !rect.is_valid() {
            return Err(SpatialError::InvalidRectangle(*rect));
        }

        let entry = LeafEntry {
            id,
            bbox: *rect,
            order: order_key,
        };
        self.insert_entry(entry);
        self.entries.insert(id, entry);
        Ok(())
    }

    fn delete(&mut self, id: ObjectKey) -> SpatialResult<BoundingBox> {
        if id < 0 {
            return Err(SpatialError::InvalidKey(id));
        }
        let entry = *self.entries.get(&id).ok_or(SpatialError::NotFound(id))?;

        let mut orphans = Vec::new();
        if !self.remove_at(self.root, &entry, &mut orphans) {
            return Err(SpatialError::InvalidOperation(format!(
                "object key {} is indexed but not reachable from the root",
                id
            )));
        }
        self.entries.remove(&id);
        self.collapse_root();

        if !orphans.is_empty() {
            trace!("Reinserting {} entries from underfull nodes", orphans.len());
        }
        for orphan in orphans {
            self.insert_entry(orphan);
        }

        Ok(entry.bbox)
    }

    fn exists(&self, id: ObjectKey, extents_out: Option<&mut [f64; 4]>) -> bool {
        let found = self.entries.get(&id);
        if let Some(out) = extents_out {
            found
                .map_or(BoundingBox::empty(), |entry| entry.bbox)
                .write_to(out);
        }
        found.is_some()
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn query_overlap<'a>(
        &'a self,
        query: &BoundingBox,
        extents_out: Option<&'a mut [f64; 4]>,
        reverse: bool,
    ) -> OverlapEnumerator<'a> {
        OverlapEnumerator::new(self, *query, extents_out, reverse)
    }

    fn clear(&mut self) {
        debug!("Clearing tree with {} entries", self.entries.len());
        *self = Self::empty_with(self.config);
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Area costs can be NaN for infinite rectangles; treat those as worst.
fn cost(value: f64) -> f64 {
    if value.is_nan() {
        f64::INFINITY
    } else {
        value
    }
}

/// Least enlargement, then smallest area, then lowest index.
fn choose_subtree(children: &[ChildRef], bbox: &BoundingBox) -> usize {
    let mut best_idx = 0;
    let mut best_enlargement = f64::INFINITY;
    let mut best_area = f64::INFINITY;

    for (i, child) in children.iter().enumerate() {
        let enlargement = cost(child.bbox.enlargement(bbox));
        let area = cost(child.bbox.area());

        if i == 0
            || enlargement < best_enlargement
            || (enlargement == best_enlargement && area < best_area)
        {
            best_enlargement = enlargement;
            best_area = area;
            best_idx = i;
        }
    }
    best_idx
}

/// Guttman's quadratic split.
///
/// Seeds are the pair wasting the most area when grouped together. The rest
/// is handed out one item at a time, always the item with the strongest
/// preference first, to the group that grows the least. A group takes all
/// remaining items once it needs them to reach `min_fill`.
pub(super) fn quadratic_split<T: Bounded + Copy>(items: Vec<T>, min_fill: usize) -> (Vec<T>, Vec<T>) {
    let (seed1, seed2) = pick_seeds(&items);

    let mut group1 = vec![items[seed1]];
    let mut group2 = vec![items[seed2]];
    let mut bbox1 = *items[seed1].bbox();
    let mut bbox2 = *items[seed2].bbox();

    let mut remaining: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != seed1 && *i != seed2)
        .map(|(_, item)| item)
        .collect();

    while !remaining.is_empty() {
        if group1.len() + remaining.len() <= min_fill {
            group1.append(&mut remaining);
            break;
        }
        if group2.len() + remaining.len() <= min_fill {
            group2.append(&mut remaining);
            break;
        }

        let item = remaining.remove(pick_next(&remaining, &bbox1, &bbox2));
        let grow1 = cost(bbox1.enlargement(item.bbox()));
        let grow2 = cost(bbox2.enlargement(item.bbox()));

        let to_first = match grow1.partial_cmp(&grow2) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => {
                let (area1, area2) = (cost(bbox1.area()), cost(bbox2.area()));
                area1 < area2 || (area1 == area2 && group1.len() <= group2.len())
            }
        };

        if to_first {
            bbox1.expand(item.bbox());
            group1.push(item);
        } else {
            bbox2.expand(item.bbox());
            group2.push(item);
        }
    }

    if !remaining.is_empty() {
        group1.append(&mut remaining);
    }
    (group1, group2)
}

fn pick_seeds<T: Bounded>(items: &[T]) -> (usize, usize) {
    let mut best_pair = (0, 1);
    let mut max_waste = f64::NEG_INFINITY;

    for (i, first) in items.iter().enumerate() {
        for (j, second) in items.iter().enumerate().skip(i + 1) {
            let waste = first.bbox().dead_space(second.bbox());
            if waste > max_waste {
                max_waste = waste;
                best_pair = (i, j);
            }
        }
    }
    best_pair
}

fn pick_next<T: Bounded>(remaining: &[T], bbox1: &BoundingBox, bbox2: &BoundingBox) -> usize {
    let mut best_idx = 0;
    let mut max_difference = f64::NEG_INFINITY;

    for (i, item) in remaining.iter().enumerate() {
        let difference = (cost(bbox1.enlargement(item.bbox()))
            - cost(bbox2.enlargement(item.bbox())))
        .abs();
        if difference > max_difference {
            max_difference = difference;
            best_idx = i;
        }
    }
    best_idx
}

// ============================================================================
// Tests
// ============================================================================
