//! Ordered set of non-negative 64-bit keys backed by a B-tree.

use std::fmt;
use std::ops::{Bound, RangeBounds};

use crate::rtree::{SpatialError, SpatialResult};

/// Minimum degree used by `OrderedLongSet::new()`
pub const DEFAULT_MIN_DEGREE: usize = 16;

#[derive(Debug, Clone, Default)]
struct BNode {
    keys: Vec<u64>,
    /// Empty for leaves, `keys.len() + 1` entries otherwise
    children: Vec<usize>,
}

impl BNode {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A set of distinct `u64` keys kept in ascending order.
///
/// Nodes hold between `t - 1` and `2t - 1` keys (the root may hold fewer),
/// where `t` is the minimum degree. Inserting a present key and removing an
/// absent one are both no-ops reported through the `bool` result.
///
/// # Example
/// ```rust
/// use netview_spatial::OrderedLongSet;
///
/// let mut set: OrderedLongSet = [5, 1, 9, 3].into_iter().collect();
/// assert!(!set.insert(5));
/// assert!(set.remove(1));
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 5, 9]);
/// assert_eq!(set.range(4..).collect::<Vec<_>>(), vec![5, 9]);
/// ```
#[derive(Clone)]
pub struct OrderedLongSet {
    nodes: Vec<BNode>,
    free_nodes: Vec<usize>,
    root: usize,
    min_degree: usize,
    len: usize,
}

impl Default for OrderedLongSet {
    fn default() -> Self {
        Self::empty_with(DEFAULT_MIN_DEGREE)
    }
}

impl OrderedLongSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set whose nodes split at `2 * min_degree - 1` keys.
    pub fn with_min_degree(min_degree: usize) -> SpatialResult<Self> {
        if min_degree < 2 {
            return Err(SpatialError::InvalidConfig(format!(
                "minimum degree must be at least 2, got {}",
                min_degree
            )));
        }
        Ok(Self::empty_with(min_degree))
    }

    fn empty_with(min_degree: usize) -> Self {
        Self {
            nodes: vec![BNode::default()],
            free_nodes: Vec::new(),
            root: 0,
            min_degree,
            len: 0,
        }
    }

    pub fn min_degree(&self) -> usize {
        self.min_degree
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        *self = Self::empty_with(self.min_degree);
    }

    pub fn contains(&self, key: u64) -> bool {
        let mut node = &self.nodes[self.root];
        loop {
            let pos = node.keys.partition_point(|&k| k < key);
            if node.keys.get(pos) == Some(&key) {
                return true;
            }
            match node.children.get(pos) {
                Some(&child) => node = &self.nodes[child],
                None => return false,
            }
        }
    }

    /// Smallest key, if any.
    pub fn first(&self) -> Option<u64> {
        let mut node = &self.nodes[self.root];
        while let Some(&child) = node.children.first() {
            node = &self.nodes[child];
        }
        node.keys.first().copied()
    }

    /// Largest key, if any.
    pub fn last(&self) -> Option<u64> {
        let mut node = &self.nodes[self.root];
        while let Some(&child) = node.children.last() {
            node = &self.nodes[child];
        }
        node.keys.last().copied()
    }

    /// Add `key`; returns false if it was already present.
    pub fn insert(&mut self, key: u64) -> bool {
        if self.contains(key) {
            return false;
        }

        let root = self.root;
        if self.nodes[root].keys.len() == self.max_keys() {
            let new_root = self.allocate(BNode {
                keys: Vec::new(),
                children: vec![root],
            });
            self.root = new_root;
            self.split_child(new_root, 0);
        }
        self.insert_non_full(self.root, key);
        self.len += 1;
        true
    }

    /// Remove `key`; returns false if it was not present.
    pub fn remove(&mut self, key: u64) -> bool {
        if !self.contains(key) {
            return false;
        }

        self.remove_from(self.root, key);

        let root = self.root;
        if self.nodes[root].keys.is_empty() {
            if let Some(&only_child) = self.nodes[root].children.first() {
                self.root = only_child;
                self.release(root);
            }
        }
        self.len -= 1;
        true
    }

    /// Ascending iterator over all keys.
    pub fn iter(&self) -> Iter<'_> {
        self.range(..)
    }

    /// Ascending iterator over the keys inside `range`.
    pub fn range<R: RangeBounds<u64>>(&self, range: R) -> Iter<'_> {
        Iter::new(self, range.start_bound().cloned(), range.end_bound().cloned())
    }

    /// Number of keys inside `range`.
    pub fn count_range<R: RangeBounds<u64>>(&self, range: R) -> usize {
        self.range(range).count()
    }

    fn max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }

    fn allocate(&mut self, node: BNode) -> usize {
        match self.free_nodes.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: usize) {
        self.nodes[id] = BNode::default();
        self.free_nodes.push(id);
    }

    /// Split the full child at `pos`, lifting its median into `parent`.
    fn split_child(&mut self, parent: usize, pos: usize) {
        let t = self.min_degree;
        let child = self.nodes[parent].children[pos];

        let (median, right) = {
            let node = &mut self.nodes[child];
            let right_keys = node.keys.split_off(t);
            let right_children = if node.is_leaf() {
                Vec::new()
            } else {
                node.children.split_off(t)
            };
            let median = node.keys.pop();
            (
                median,
                BNode {
                    keys: right_keys,
                    children: right_children,
                },
            )
        };

        let right_id = self.allocate(right);
        if let Some(median) = median {
            let parent_node = &mut self.nodes[parent];
            parent_node.keys.insert(pos, median);
            parent_node.children.insert(pos + 1, right_id);
        }
    }

    fn insert_non_full(&mut self, mut node: usize, key: u64) {
        loop {
            let mut pos = self.nodes[node].keys.partition_point(|&k| k < key);
            if self.nodes[node].is_leaf() {
                self.nodes[node].keys.insert(pos, key);
                return;
            }

            let child = self.nodes[node].children[pos];
            if self.nodes[child].keys.len() == self.max_keys() {
                self.split_child(node, pos);
                if key > self.nodes[node].keys[pos] {
                    pos += 1;
                }
            }
            node = self.nodes[node].children[pos];
        }
    }

    /// Remove a key known to be in the subtree, topping up every child
    /// before descending into it so no node underflows.
    fn remove_from(&mut self, mut node: usize, mut key: u64) {
        let t = self.min_degree;
        loop {
            let pos = self.nodes[node].keys.partition_point(|&k| k < key);
            let found = self.nodes[node].keys.get(pos) == Some(&key);

            if self.nodes[node].is_leaf() {
                if found {
                    self.nodes[node].keys.remove(pos);
                }
                return;
            }

            if found {
                let left = self.nodes[node].children[pos];
                let right = self.nodes[node].children[pos + 1];
                if self.nodes[left].keys.len() >= t {
                    let predecessor = self.max_key(left);
                    self.nodes[node].keys[pos] = predecessor;
                    node = left;
                    key = predecessor;
                } else if self.nodes[right].keys.len() >= t {
                    let successor = self.min_key(right);
                    self.nodes[node].keys[pos] = successor;
                    node = right;
                    key = successor;
                } else {
                    self.merge_children(node, pos);
                    node = left;
                }
            } else {
                node = self.fill_child(node, pos);
            }
        }
    }

    fn min_key(&self, mut node: usize) -> u64 {
        while let Some(&child) = self.nodes[node].children.first() {
            node = child;
        }
        self.nodes[node].keys.first().copied().unwrap_or_default()
    }

    fn max_key(&self, mut node: usize) -> u64 {
        while let Some(&child) = self.nodes[node].children.last() {
            node = child;
        }
        self.nodes[node].keys.last().copied().unwrap_or_default()
    }

    /// Make sure the child at `pos` holds at least `t` keys and return the
    /// node to descend into.
    fn fill_child(&mut self, node: usize, pos: usize) -> usize {
        let t = self.min_degree;
        let children = &self.nodes[node].children;
        let child = children[pos];
        if self.nodes[child].keys.len() >= t {
            return child;
        }

        let left = pos.checked_sub(1).map(|p| children[p]);
        let right = children.get(pos + 1).copied();

        if left.is_some_and(|l| self.nodes[l].keys.len() >= t) {
            self.borrow_from_left(node, pos);
            child
        } else if right.is_some_and(|r| self.nodes[r].keys.len() >= t) {
            self.borrow_from_right(node, pos);
            child
        } else if right.is_some() {
            self.merge_children(node, pos);
            child
        } else {
            self.merge_children(node, pos - 1);
            left.unwrap_or(child)
        }
    }

    fn borrow_from_left(&mut self, node: usize, pos: usize) {
        let left = self.nodes[node].children[pos - 1];
        let child = self.nodes[node].children[pos];

        if let Some(lifted) = self.nodes[left].keys.pop() {
            let moved_child = self.nodes[left].children.pop();
            let separator = std::mem::replace(&mut self.nodes[node].keys[pos - 1], lifted);
            let target = &mut self.nodes[child];
            target.keys.insert(0, separator);
            if let Some(moved_child) = moved_child {
                target.children.insert(0, moved_child);
            }
        }
    }

    fn borrow_from_right(&mut self, node: usize, pos: usize) {
        let right = self.nodes[node].children[pos + 1];
        let child = self.nodes[node].children[pos];

        if self.nodes[right].keys.is_empty() {
            return;
        }
        let lifted = self.nodes[right].keys.remove(0);
        let moved_child = if self.nodes[right].is_leaf() {
            None
        } else {
            Some(self.nodes[right].children.remove(0))
        };
        let separator = std::mem::replace(&mut self.nodes[node].keys[pos], lifted);
        let target = &mut self.nodes[child];
        target.keys.push(separator);
        target.children.extend(moved_child);
    }

    /// Merge the child at `pos + 1` and the separator into the child at `pos`.
    fn merge_children(&mut self, node: usize, pos: usize) {
        let left = self.nodes[node].children[pos];
        let separator = self.nodes[node].keys.remove(pos);
        let right = self.nodes[node].children.remove(pos + 1);

        let right_node = std::mem::take(&mut self.nodes[right]);
        let target = &mut self.nodes[left];
        target.keys.push(separator);
        target.keys.extend(right_node.keys);
        target.children.extend(right_node.children);
        self.release(right);
    }
}

impl fmt::Debug for OrderedLongSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl PartialEq for OrderedLongSet {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for OrderedLongSet {}

impl FromIterator<u64> for OrderedLongSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<u64> for OrderedLongSet {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a> IntoIterator for &'a OrderedLongSet {
    type Item = u64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Lazy ascending iterator over an [`OrderedLongSet`].
pub struct Iter<'a> {
    set: &'a OrderedLongSet,
    /// Path to the next key: each frame is a node and the index of the next
    /// key to yield from it.
    stack: Vec<(usize, usize)>,
    upper: Bound<u64>,
}

impl<'a> Iter<'a> {
    fn new(set: &'a OrderedLongSet, lower: Bound<u64>, upper: Bound<u64>) -> Self {
        let mut stack = Vec::new();
        let mut node = set.root;
        loop {
            let keys = &set.nodes[node].keys;
            let idx = match lower {
                Bound::Unbounded => 0,
                Bound::Included(k) => keys.partition_point(|&x| x < k),
                Bound::Excluded(k) => keys.partition_point(|&x| x <= k),
            };
            stack.push((node, idx));
            match set.nodes[node].children.get(idx) {
                Some(&child) => node = child,
                None => break,
            }
        }
        Self { set, stack, upper }
    }

    fn past_upper(&self, key: u64) -> bool {
        match self.upper {
            Bound::Unbounded => false,
            Bound::Included(limit) => key > limit,
            Bound::Excluded(limit) => key >= limit,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            let set = self.set;
            let (node_id, idx) = *self.stack.last()?;
            let node = &set.nodes[node_id];

            if idx >= node.keys.len() {
                self.stack.pop();
                continue;
            }

            let key = node.keys[idx];
            if self.past_upper(key) {
                self.stack.clear();
                return None;
            }

            if let Some(frame) = self.stack.last_mut() {
                frame.1 = idx + 1;
            }
            if let Some(&child) = node.children.get(idx + 1) {
                let mut next = child;
                loop {
                    self.stack.push((next, 0));
                    match set.nodes[next].children.first() {
                        Some(&first) => next = first,
                        None => break,
                    }
                }
            }
            return Some(key);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.stack.is_empty() {
            (0, Some(0))
        } else {
            (0, Some(self.set.len))
        }
    }
}

impl std::iter::FusedIterator for Iter<'_> {}
