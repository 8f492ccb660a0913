use serde::{Deserialize, Serialize};

/// An axis-aligned 2D rectangle given by its minimum and maximum corners.
///
/// `BoundingBox` is both the extent stored for every indexed object and the
/// shape of overlap queries. Edges are closed: two boxes that merely touch
/// are considered to intersect.
///
/// The inverted infinite box returned by [`BoundingBox::empty`] stands for
/// "no extent". It is the identity of [`BoundingBox::union`], which lets
/// bounding-box accumulation start from it without a separate flag.
///
/// # Examples
///
/// ```rust
/// use netview_spatial::BoundingBox;
///
/// let node = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
/// let edge_label = BoundingBox::new(1.0, 0.5, 2.0, 0.75);
///
/// assert!(node.intersects(&edge_label));
/// assert_eq!(
///     BoundingBox::empty().union(&node).union(&edge_label),
///     BoundingBox::new(0.0, 0.0, 2.0, 1.0)
/// );
/// ```
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BoundingBox({}, {}, {}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

impl BoundingBox {
    /// Creates a new bounding box with the specified coordinates.
    ///
    /// No validation happens here; see [`BoundingBox::is_valid`].
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The inverted infinite rectangle `(+inf, +inf, -inf, -inf)`.
    pub const fn empty() -> BoundingBox {
        BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// The rectangle covering the whole plane.
    pub const fn infinite() -> BoundingBox {
        BoundingBox {
            min_x: f64::NEG_INFINITY,
            min_y: f64::NEG_INFINITY,
            max_x: f64::INFINITY,
            max_y: f64::INFINITY,
        }
    }

    /// Builds a box from `[min_x, min_y, max_x, max_y]`.
    pub fn from_array(extents: [f64; 4]) -> BoundingBox {
        BoundingBox::new(extents[0], extents[1], extents[2], extents[3])
    }

    /// Returns `[min_x, min_y, max_x, max_y]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Copies the four extents into `out` in `min_x, min_y, max_x, max_y` order.
    pub fn write_to(&self, out: &mut [f64; 4]) {
        *out = self.to_array();
    }

    /// Returns the width of the bounding box.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounding box.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns the area of the bounding box. An empty box has zero area.
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.width() * self.height()
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Checks if this bounding box contains a point, edges included.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Checks if this bounding box fully contains another bounding box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Checks if this bounding box intersects another one. Touching edges count.
    ///
    /// Inverted or NaN boxes intersect nothing, not even [`BoundingBox::infinite`].
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Returns the union of this bounding box with another.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grows this bounding box in place to cover `other`.
    pub fn expand(&mut self, other: &BoundingBox) {
        *self = self.union(other);
    }

    /// Area growth needed for this box to also cover `other`.
    pub fn enlargement(&self, other: &BoundingBox) -> f64 {
        self.union(other).area() - self.area()
    }

    /// Area of the union of both boxes not covered by either one alone.
    ///
    /// Overlapping boxes can yield a negative value.
    pub fn dead_space(&self, other: &BoundingBox) -> f64 {
        self.union(other).area() - self.area() - other.area()
    }

    /// Checks if this bounding box is a point (zero area).
    pub fn is_point(&self) -> bool {
        self.min_x == self.max_x && self.min_y == self.max_y
    }

    /// Checks if this bounding box is valid (min <= max on both axes, no NaN).
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// True for inverted boxes such as [`BoundingBox::empty`].
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }
}
