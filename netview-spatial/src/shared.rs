//! Thread-safe handle around an [`RTree`].

use std::sync::Arc;

use parking_lot::RwLock;

use crate::bounding_box::BoundingBox;
use crate::rtree::{ObjectKey, OrderKey, RTree, SpatialResult};
use crate::spatial_index::SpatialIndex;

/// A cloneable, lock-protected R-Tree.
///
/// Updates take the write lock. Queries run under the read lock and collect
/// their results before returning, so no lock outlives a call. Use
/// [`SharedRTree::read`] to consume a query lazily while holding the lock.
///
/// # Example
/// ```rust
/// use netview_spatial::{BoundingBox, SharedRTree};
///
/// let tree = SharedRTree::default();
/// let writer = tree.clone();
/// std::thread::spawn(move || {
///     writer.insert(1, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.0).unwrap();
/// })
/// .join()
/// .unwrap();
///
/// let (ids, extents) = tree.query_ids(&BoundingBox::infinite(), false);
/// assert_eq!(ids, vec![1]);
/// assert_eq!(extents, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
/// ```
#[derive(Clone, Default)]
pub struct SharedRTree {
    inner: Arc<SharedRTreeInner>,
}

#[derive(Default)]
struct SharedRTreeInner {
    tree: RwLock<RTree>,
}

impl SharedRTree {
    /// Create an empty shared tree with the given branching factor.
    pub fn new(branching_factor: usize) -> SpatialResult<Self> {
        Ok(Self::from_tree(RTree::new(branching_factor)?))
    }

    pub fn from_tree(tree: RTree) -> Self {
        Self {
            inner: Arc::new(SharedRTreeInner {
                tree: RwLock::new(tree),
            }),
        }
    }

    pub fn insert(&self, id: ObjectKey, rect: &BoundingBox, order_key: OrderKey) -> SpatialResult<()> {
        self.inner.tree.write().insert(id, rect, order_key)
    }

    pub fn delete(&self, id: ObjectKey) -> SpatialResult<BoundingBox> {
        self.inner.tree.write().delete(id)
    }

    /// Extents of `id`, if indexed.
    pub fn exists(&self, id: ObjectKey) -> Option<BoundingBox> {
        self.inner.tree.read().extents(id)
    }

    pub fn size(&self) -> usize {
        self.inner.tree.read().size()
    }

    pub fn clear(&self) {
        self.inner.tree.write().clear();
    }

    /// Keys overlapping `query` in canonical order, with their combined extents.
    pub fn query_ids(&self, query: &BoundingBox, reverse: bool) -> (Vec<ObjectKey>, BoundingBox) {
        let tree = self.inner.tree.read();
        let mut enumerator = tree.query_overlap(query, None, reverse);
        let ids: Vec<ObjectKey> = enumerator.by_ref().collect();
        (ids, enumerator.extents())
    }

    /// Run `f` against the tree under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&RTree) -> R) -> R {
        f(&self.inner.tree.read())
    }

    /// Run `f` against the tree under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut RTree) -> R) -> R {
        f(&mut self.inner.tree.write())
    }

    pub fn serialize(&self) -> SpatialResult<Vec<u8>> {
        self.inner.tree.read().serialize()
    }
}
