//! Persistence and integrity features for the R-Tree.
//!
//! This module provides:
//! - A compact byte format for saving and restoring a tree
//! - Validation of untrusted byte streams before anything is rebuilt
//! - Integrity checking of a live tree
//!
//! The stream is a bincode encoded [`TreeHeader`] followed by the node
//! payload. Nodes are stored breadth first from the root; internal nodes
//! list their children by payload index. Bounding boxes, counts and key
//! ranges are not stored and are recomputed on load.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::rtree_config::RTreeConfig;
use super::rtree_constants::{FORMAT_VERSION, MAGIC};
use super::rtree_impl::RTree;
use super::rtree_types::{LeafEntry, Node, NodeId, ObjectKey, SpatialError, SpatialResult};

/// Trees taller than this cannot come out of a real insert sequence.
const MAX_TREE_HEIGHT: u32 = 64;

// ============================================================================
// Byte Format
// ============================================================================

/// Fixed header in front of every serialized tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeHeader {
    pub magic: u32,
    pub version: u32,
    pub branching_factor: u32,
    pub min_fill: u32,
    pub entry_count: u64,
    pub height: u32,
    pub node_count: u32,
    /// Payload index of the root node
    pub root: u32,
    /// CRC32 of the encoded node payload
    pub checksum: u32,
}

/// A node as stored in the byte stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeImage {
    Leaf { entries: Vec<LeafEntry> },
    Internal { children: Vec<u32> },
}

impl TreeHeader {
    fn validate(&self) -> SpatialResult<()> {
        if self.magic != MAGIC {
            return Err(SpatialError::Deserialization(format!(
                "Invalid magic number: expected {:#x}, got {:#x}",
                MAGIC, self.magic
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(SpatialError::Deserialization(format!(
                "Unsupported format version {}",
                self.version
            )));
        }
        if self.height > MAX_TREE_HEIGHT {
            return Err(SpatialError::Deserialization(format!(
                "Tree height {} exceeds the maximum of {}",
                self.height, MAX_TREE_HEIGHT
            )));
        }
        if self.root >= self.node_count {
            return Err(SpatialError::Deserialization(format!(
                "Root index {} out of range for {} nodes",
                self.root, self.node_count
            )));
        }
        Ok(())
    }
}

/// MSB-first CRC32 with inverted output (CRC-32/BZIP2)
fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0x04C11DB7;

    let crc = data.iter().fold(0xFFFFFFFFu32, |mut crc, &byte| {
        crc ^= (byte as u32) << 24;
        for _ in 0..8 {
            crc = if crc & 0x80000000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
        crc
    });
    crc ^ 0xFFFFFFFF
}

/// Encode a header and its nodes, stamping the payload checksum.
fn encode(header: TreeHeader, nodes: &[NodeImage]) -> SpatialResult<Vec<u8>> {
    let config = bincode::config::legacy();
    let payload = bincode::serde::encode_to_vec(nodes, config)
        .map_err(|e| SpatialError::Serialization(e.to_string()))?;
    let header = TreeHeader {
        checksum: crc32(&payload),
        ..header
    };

    let mut bytes = bincode::serde::encode_to_vec(&header, config)
        .map_err(|e| SpatialError::Serialization(e.to_string()))?;
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

fn invalid(message: String) -> SpatialError {
    SpatialError::Deserialization(message)
}

impl RTree {
    /// Encode the tree into a self-contained byte vector.
    pub fn serialize(&self) -> SpatialResult<Vec<u8>> {
        let mut order = vec![self.root];
        let mut images = Vec::new();
        let mut next = 0;

        while next < order.len() {
            let image = match &self.nodes[order[next]] {
                Node::Leaf { entries } => NodeImage::Leaf {
                    entries: entries.clone(),
                },
                Node::Internal { children } => {
                    let mut refs = Vec::with_capacity(children.len());
                    for child in children {
                        let index = u32::try_from(order.len()).map_err(|_| {
                            SpatialError::Serialization("Too many nodes to encode".to_string())
                        })?;
                        refs.push(index);
                        order.push(child.node);
                    }
                    NodeImage::Internal { children: refs }
                }
            };
            images.push(image);
            next += 1;
        }

        let header = TreeHeader {
            magic: MAGIC,
            version: FORMAT_VERSION,
            branching_factor: self.config.branching_factor() as u32,
            min_fill: self.config.min_fill() as u32,
            entry_count: self.entries.len() as u64,
            height: self.height as u32,
            node_count: images.len() as u32,
            root: 0,
            checksum: 0,
        };
        encode(header, &images)
    }

    /// Rebuild a tree from bytes produced by [`RTree::serialize`].
    ///
    /// The stream is fully validated. Anything that would not have come out of
    /// `serialize` is rejected with `SpatialError::Deserialization` and no tree
    /// is returned.
    pub fn deserialize(bytes: &[u8]) -> SpatialResult<RTree> {
        Self::decode(bytes).inspect_err(|e| warn!("Rejected serialized tree: {}", e))
    }

    fn decode(bytes: &[u8]) -> SpatialResult<RTree> {
        let config = bincode::config::legacy();
        let (header, consumed): (TreeHeader, usize) =
            bincode::serde::decode_from_slice(bytes, config)
                .map_err(|e| invalid(format!("Failed to read header: {}", e)))?;
        header.validate()?;

        let payload = &bytes[consumed..];
        let checksum = crc32(payload);
        if checksum != header.checksum {
            return Err(invalid(format!(
                "Checksum mismatch: expected {:#x}, got {:#x}",
                header.checksum, checksum
            )));
        }

        let (images, used): (Vec<NodeImage>, usize) =
            bincode::serde::decode_from_slice(payload, config)
                .map_err(|e| invalid(format!("Failed to read nodes: {}", e)))?;
        if used != payload.len() {
            return Err(invalid(format!(
                "{} trailing bytes after the node payload",
                payload.len() - used
            )));
        }
        if images.len() != header.node_count as usize {
            return Err(invalid(format!(
                "Header announces {} nodes, payload holds {}",
                header.node_count,
                images.len()
            )));
        }

        let tree_config = RTreeConfig::new(header.branching_factor as usize)
            .with_min_fill(header.min_fill as usize);
        tree_config
            .validate()
            .map_err(|e| invalid(format!("Invalid node capacity settings: {}", e)))?;

        let mut loader = Loader {
            images: &images,
            visited: vec![false; images.len()],
            tree: RTree {
                config: tree_config,
                nodes: Vec::with_capacity(images.len()),
                free_nodes: Vec::new(),
                root: 0,
                height: header.height as usize,
                entries: HashMap::new(),
            },
        };
        let root = loader.load(header.root as usize, 0)?;

        if let Some(index) = loader.visited.iter().position(|v| !v) {
            return Err(invalid(format!("Node {} is not reachable from the root", index)));
        }
        let mut tree = loader.tree;
        if tree.entries.len() as u64 != header.entry_count {
            return Err(invalid(format!(
                "Header announces {} entries, nodes hold {}",
                header.entry_count,
                tree.entries.len()
            )));
        }
        tree.root = root;

        debug!(
            "Deserialized tree with {} entries, {} nodes and height {}",
            tree.entries.len(),
            tree.nodes.len(),
            tree.height
        );
        Ok(tree)
    }
}

/// Rebuilds the node arena from decoded images, children before parents.
struct Loader<'b> {
    images: &'b [NodeImage],
    visited: Vec<bool>,
    tree: RTree,
}

impl Loader<'_> {
    fn load(&mut self, index: usize, depth: usize) -> SpatialResult<NodeId> {
        if self.visited[index] {
            return Err(invalid(format!("Node {} is referenced more than once", index)));
        }
        self.visited[index] = true;

        let is_root = depth == 0;
        let branching_factor = self.tree.config.branching_factor();
        let min_fill = self.tree.config.min_fill();

        let images = self.images;
        let node = match &images[index] {
            NodeImage::Leaf { entries } => {
                if depth != self.tree.height {
                    return Err(invalid(format!(
                        "Leaf {} is at depth {} in a tree of height {}",
                        index, depth, self.tree.height
                    )));
                }
                for entry in entries {
                    if entry.id < 0 {
                        return Err(invalid(format!("Negative object key {}", entry.id)));
                    }
                    if !entry.bbox.is_valid() {
                        return Err(invalid(format!(
                            "Object key {} has invalid extents {}",
                            entry.id, entry.bbox
                        )));
                    }
                    if self.tree.entries.insert(entry.id, *entry).is_some() {
                        return Err(invalid(format!("Duplicate object key {}", entry.id)));
                    }
                }
                Node::Leaf {
                    entries: entries.clone(),
                }
            }
            NodeImage::Internal { children } => {
                if depth >= self.tree.height {
                    return Err(invalid(format!(
                        "Internal node {} is at depth {} in a tree of height {}",
                        index, depth, self.tree.height
                    )));
                }
                if children.is_empty() {
                    return Err(invalid(format!("Internal node {} has no children", index)));
                }
                if is_root && children.len() < 2 {
                    return Err(invalid(format!("Internal root {} has a single child", index)));
                }
                let mut refs = Vec::with_capacity(children.len());
                for &child in children {
                    let child = child as usize;
                    if child >= images.len() {
                        return Err(invalid(format!(
                            "Node {} references missing node {}",
                            index, child
                        )));
                    }
                    let child_id = self.load(child, depth + 1)?;
                    refs.push(self.tree.summarize(child_id));
                }
                Node::Internal { children: refs }
            }
        };

        let len = node.len();
        if len > branching_factor || (!is_root && len < min_fill) {
            return Err(invalid(format!(
                "Node {} holds {} items, outside the allowed fill",
                index, len
            )));
        }
        Ok(self.tree.allocate(node))
    }
}

// ============================================================================
// Integrity Checking
// ============================================================================

/// Result of integrity check operation
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Total nodes checked
    pub nodes_checked: u64,
    /// Total leaf entries checked
    pub entries_checked: u64,
    /// Summary of findings
    pub is_valid: bool,
    /// Detailed error messages
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn new() -> Self {
        Self {
            nodes_checked: 0,
            entries_checked: 0,
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

impl Default for IntegrityReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RTree {
    /// Walk the whole tree and verify its structural invariants.
    ///
    /// Checks node fill, leaf depth, cached child summaries, and that the key
    /// index and the leaves hold exactly the same entries.
    pub fn check_integrity(&self) -> IntegrityReport {
        let mut report = IntegrityReport::new();
        let mut reachable = HashSet::new();
        let mut seen = HashSet::new();

        self.check_node(self.root, 0, &mut reachable, &mut seen, &mut report);

        if seen.len() != self.entries.len() {
            report.error(format!(
                "Key index holds {} entries, leaves hold {}",
                self.entries.len(),
                seen.len()
            ));
        }
        for free in &self.free_nodes {
            if reachable.contains(free) {
                report.error(format!("Free node {} is still reachable", free));
            }
        }
        report
    }

    fn check_node(
        &self,
        node_id: NodeId,
        depth: usize,
        reachable: &mut HashSet<NodeId>,
        seen: &mut HashSet<ObjectKey>,
        report: &mut IntegrityReport,
    ) {
        if !reachable.insert(node_id) {
            report.error(format!("Node {} is reachable twice", node_id));
            return;
        }
        report.nodes_checked += 1;

        let node = &self.nodes[node_id];
        let len = node.len();
        if len > self.config.branching_factor() {
            report.error(format!("Node {} overflows with {} items", node_id, len));
        }
        if node_id != self.root && len < self.config.min_fill() {
            report.error(format!("Node {} underflows with {} items", node_id, len));
        }

        match node {
            Node::Leaf { entries } => {
                if depth != self.height {
                    report.error(format!(
                        "Leaf {} at depth {}, expected {}",
                        node_id, depth, self.height
                    ));
                }
                for entry in entries {
                    report.entries_checked += 1;
                    if !seen.insert(entry.id) {
                        report.error(format!("Object key {} appears twice", entry.id));
                    }
                    if self.entries.get(&entry.id) != Some(entry) {
                        report.error(format!(
                            "Object key {} disagrees with the key index",
                            entry.id
                        ));
                    }
                }
            }
            Node::Internal { children } => {
                if children.is_empty() {
                    report.error(format!("Internal node {} has no children", node_id));
                } else if node_id == self.root && children.len() == 1 {
                    report.error(format!("Internal root {} has a single child", node_id));
                }
                for child in children {
                    self.check_node(child.node, depth + 1, reachable, seen, report);
                    let actual = self.summarize(child.node);
                    if actual.bbox != child.bbox {
                        report.error(format!(
                            "Child {} of node {} has stale extents {}, expected {}",
                            child.node, node_id, child.bbox, actual.bbox
                        ));
                    }
                    if actual.count != child.count
                        || actual.first != child.first
                        || actual.last != child.last
                    {
                        report.error(format!(
                            "Child {} of node {} has a stale summary",
                            child.node, node_id
                        ));
                    }
                }
            }
        }
    }
}
