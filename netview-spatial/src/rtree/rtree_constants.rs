//! Constants for the in-memory R-Tree.

/// Branching factor used by `RTree::default()`
pub const DEFAULT_BRANCHING_FACTOR: usize = 11;

/// Smallest branching factor that still allows a node to split in two
pub const MIN_BRANCHING_FACTOR: usize = 2;

/// Magic number for serialized trees ("NVRT" - NetView R-Tree)
pub const MAGIC: u32 = 0x4E56_5254;

/// Serialized format version
pub const FORMAT_VERSION: u32 = 1;
