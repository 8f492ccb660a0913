//! Construction parameters for an R-Tree.

use super::rtree_constants::{DEFAULT_BRANCHING_FACTOR, MIN_BRANCHING_FACTOR};
use super::rtree_types::{SpatialError, SpatialResult};

/// Node capacity settings for an [`RTree`](super::RTree).
///
/// # Examples
///
/// ```rust
/// use netview_spatial::RTreeConfig;
///
/// let config = RTreeConfig::new(8).with_min_fill(3);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.min_fill(), 3);
///
/// // Defaults to half the branching factor, rounded up
/// assert_eq!(RTreeConfig::new(3).min_fill(), 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RTreeConfig {
    branching_factor: usize,
    min_fill: Option<usize>,
}

/// Configurations are equal when they produce the same node bounds, whether
/// the minimum fill was set explicitly or derived.
impl PartialEq for RTreeConfig {
    fn eq(&self, other: &Self) -> bool {
        self.branching_factor == other.branching_factor && self.min_fill() == other.min_fill()
    }
}

impl Eq for RTreeConfig {}

impl Default for RTreeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BRANCHING_FACTOR)
    }
}

impl RTreeConfig {
    /// Creates a configuration with the given maximum node fill.
    pub fn new(branching_factor: usize) -> Self {
        Self {
            branching_factor,
            min_fill: None,
        }
    }

    /// Overrides the minimum fill of non-root nodes.
    pub fn with_min_fill(mut self, min_fill: usize) -> Self {
        self.min_fill = Some(min_fill);
        self
    }

    /// Maximum number of entries or children per node.
    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// Minimum number of entries or children per non-root node.
    pub fn min_fill(&self) -> usize {
        self.min_fill
            .unwrap_or_else(|| self.branching_factor.div_ceil(2))
    }

    /// Checks that nodes can be split and refilled with these bounds.
    ///
    /// A split distributes `branching_factor + 1` items over two nodes, so the
    /// minimum fill may be at most half of that.
    pub fn validate(&self) -> SpatialResult<()> {
        if self.branching_factor < MIN_BRANCHING_FACTOR {
            return Err(SpatialError::InvalidConfig(format!(
                "branching factor must be at least {}, got {}",
                MIN_BRANCHING_FACTOR, self.branching_factor
            )));
        }
        if u32::try_from(self.branching_factor).is_err() {
            return Err(SpatialError::InvalidConfig(format!(
                "branching factor {} is too large",
                self.branching_factor
            )));
        }
        let min_fill = self.min_fill();
        if min_fill == 0 || min_fill > (self.branching_factor + 1) / 2 {
            return Err(SpatialError::InvalidConfig(format!(
                "minimum fill must be between 1 and {}, got {}",
                (self.branching_factor + 1) / 2,
                min_fill
            )));
        }
        Ok(())
    }
}
