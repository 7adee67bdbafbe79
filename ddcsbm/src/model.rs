//! Core data model: node blocks on a continuous id axis and rectangular
//! edge-probability blocks, grouped per edge type.
//!
//! Block boundaries are real-valued rather than integer node ids. This
//! decouples rescaling from rounding: the discrete members of a block are
//! recovered by the floor convention (`floor(start)+1 ..= floor(end)`) only
//! when a graph instance is emitted, never while the model is transformed.

use std::collections::BTreeMap;

/// Node types are opaque strings, ordered lexicographically.
pub type NodeType = String;

/// Edge types are opaque strings, ordered lexicographically.
pub type EdgeType = String;

/// Reserved meta key carrying the product of all scale factors applied
/// since the model was fitted. Absent means 1.0.
pub const SCALE_KEY: &str = "SCALE";

/// Model name plus free-form uppercase-keyed meta entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub name: String,
    pub values: BTreeMap<String, String>,
}

impl Meta {
    /// The stored cumulative scale factor, or `"1.0"` when none is recorded.
    pub fn scale(&self) -> &str {
        self.values.get(SCALE_KEY).map_or("1.0", |v| v.as_str())
    }
}

/// A contiguous half-open interval `(start, end]` of continuous node ids, all
/// sharing one node type.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBlock {
    pub start: f64,
    pub end: f64,
    pub node_type: NodeType,
}

impl NodeBlock {
    /// First discrete node id contained in the block.
    pub fn first_id(&self) -> u64 {
        self.start as u64 + 1
    }

    /// Last discrete node id contained in the block. May be smaller than
    /// [`Self::first_id`] when the interval rounds to an empty id range.
    pub fn last_id(&self) -> u64 {
        self.end as u64
    }
}

/// A rectangle over (source id, target id) space. Every ordered pair of
/// discrete ids inside the rectangle is an independent Bernoulli trial with
/// parameter `p`.
///
/// Fitting can produce `p > 1` (a recorded model failure); the value is kept
/// as computed so that scaling and serialization stay exact. Only the
/// sampler clamps into `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeBlock {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
    pub p: f64,
}

/// All probability blocks of a single edge type, ordered by
/// `(x_start, y_start)`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTypeRecord {
    pub edge_type: EdgeType,
    pub blocks: Vec<EdgeBlock>,
}

/// A fitted (or loaded, or rescaled) block model.
///
/// `nodes` is contiguous on `[0, N]` and sorted by `(start, end)`; `edges`
/// is sorted by edge type. Both orderings are deterministic functions of the
/// input given a fit seed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub meta: Meta,
    pub nodes: Vec<NodeBlock>,
    pub edges: Vec<EdgeTypeRecord>,
}

impl Model {
    /// Upper end of the continuous node axis (0.0 for an empty model).
    pub fn node_span(&self) -> f64 {
        self.nodes.last().map_or(0.0, |b| b.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_convention_recovers_discrete_ids() {
        let block = NodeBlock {
            start: 0.0,
            end: 3.0,
            node_type: "A".into(),
        };
        assert_eq!(block.first_id(), 1);
        assert_eq!(block.last_id(), 3);

        let scaled = NodeBlock {
            start: 4.5,
            end: 7.5,
            node_type: "A".into(),
        };
        assert_eq!(scaled.first_id(), 5);
        assert_eq!(scaled.last_id(), 7);
    }

    #[test]
    fn meta_scale_defaults_to_one() {
        let mut meta = Meta::default();
        assert_eq!(meta.scale(), "1.0");
        meta.values.insert(SCALE_KEY.into(), "2.5".into());
        assert_eq!(meta.scale(), "2.5");
    }
}
