//! SpatialIndex trait definition.

use crate::bounding_box::BoundingBox;
use crate::rtree::rtree_types::{ObjectKey, OrderKey, SpatialResult};
use crate::rtree::OverlapEnumerator;

/// Maps object keys to rectangles and answers overlap queries in a stable,
/// query-independent order.
///
/// Hit testing, rectangle selection and visibility culling all go through
/// this interface and consume the returned key order directly as paint or
/// pick priority.
pub trait SpatialIndex {
    /// Adds an object with its extents.
    ///
    /// `order_key` positions the object in the canonical enumeration order
    /// (ties are broken by key). It has no influence on the spatial layout.
    ///
    /// # Errors
    ///
    /// `InvalidKey` for a negative key, `DuplicateKey` if the key is already
    /// indexed and `InvalidRectangle` if min exceeds max on either axis. The
    /// index is unchanged on error.
    fn insert(&mut self, id: ObjectKey, rect: &BoundingBox, order_key: OrderKey)
        -> SpatialResult<()>;

    /// Removes an object and returns the extents it was indexed with.
    ///
    /// # Errors
    ///
    /// `InvalidKey` for a negative key and `NotFound` if the key is not
    /// indexed. The index is unchanged on error.
    fn delete(&mut self, id: ObjectKey) -> SpatialResult<BoundingBox>;

    /// Tells whether `id` is indexed.
    ///
    /// When `extents_out` is given it receives the object's extents, or the
    /// inverted infinite rectangle if the object is absent.
    fn exists(&self, id: ObjectKey, extents_out: Option<&mut [f64; 4]>) -> bool;

    /// Number of indexed objects.
    fn size(&self) -> usize;

    /// Enumerates the keys whose extents intersect `query`, edges included.
    ///
    /// Keys come out in canonical order, or in exactly the mirrored order when
    /// `reverse` is set. While the enumerator is consumed, `extents_out`
    /// tracks the bounding box of every key returned so far.
    fn query_overlap<'a>(
        &'a self,
        query: &BoundingBox,
        extents_out: Option<&'a mut [f64; 4]>,
        reverse: bool,
    ) -> OverlapEnumerator<'a>;

    /// Removes every object.
    fn clear(&mut self);
}
