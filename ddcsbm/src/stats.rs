//! Accumulated statistics of an observed typed multigraph.
//!
//! One pass over the node and edge streams collects everything the fitter
//! needs: per-node in/out degrees bucketed by edge type, a per-edge-type
//! type-to-type transition count matrix, and node/edge type tallies. All
//! maps are string-keyed and updates are O(1), so accumulation stays linear
//! in the number of observed records.

use fnv::{FnvHashMap, FnvHashSet};

use crate::model::{EdgeType, NodeType};

/// Degree, transition, and type statistics for one observed graph.
#[derive(Debug, Default)]
pub struct GraphStats {
    /// Number of `observe_node` calls (duplicates included).
    pub node_count: u64,
    /// Number of observed edges per edge type.
    pub edge_count: FnvHashMap<EdgeType, u64>,
    /// Number of observed nodes per node type.
    pub node_types: FnvHashMap<NodeType, u64>,
    /// Set of all edge types seen on any edge.
    pub edge_types: FnvHashSet<EdgeType>,
    /// Recorded type per node id; a duplicate id overwrites (last wins).
    pub node_to_type: FnvHashMap<String, NodeType>,
    /// Per edge type: (source type, target type) -> observed edge count.
    pub sbm_matrix: FnvHashMap<EdgeType, FnvHashMap<(NodeType, NodeType), u64>>,
    /// Per edge type: node id -> in-degree.
    pub in_degrees: FnvHashMap<EdgeType, FnvHashMap<String, u64>>,
    /// Per edge type: node id -> out-degree.
    pub out_degrees: FnvHashMap<EdgeType, FnvHashMap<String, u64>>,
}

impl GraphStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one node and its type.
    ///
    /// Input carries no dedup contract: a repeated id overwrites the stored
    /// type and still bumps the per-type tally.
    pub fn observe_node(&mut self, id: &str, node_type: &str) {
        self.node_count += 1;
        *self.node_types.entry(node_type.to_string()).or_default() += 1;
        self.node_to_type
            .insert(id.to_string(), node_type.to_string());
    }

    /// Record one directed edge.
    ///
    /// Endpoints without a previously observed type count toward the empty
    /// type in the transition matrix; this is recoverable, not an error.
    pub fn observe_edge(&mut self, src: &str, dst: &str, edge_type: &str) {
        *self.edge_count.entry(edge_type.to_string()).or_default() += 1;

        let src_type = self.node_type_of(src).to_string();
        let dst_type = self.node_type_of(dst).to_string();
        *self
            .sbm_matrix
            .entry(edge_type.to_string())
            .or_default()
            .entry((src_type, dst_type))
            .or_default() += 1;

        *self
            .out_degrees
            .entry(edge_type.to_string())
            .or_default()
            .entry(src.to_string())
            .or_default() += 1;
        *self
            .in_degrees
            .entry(edge_type.to_string())
            .or_default()
            .entry(dst.to_string())
            .or_default() += 1;

        self.edge_types.insert(edge_type.to_string());
    }

    /// Recorded type of a node id, or the empty type when unknown.
    pub fn node_type_of(&self, id: &str) -> &str {
        self.node_to_type.get(id).map_or("", |t| t.as_str())
    }

    /// Observed edge count between an ordered pair of node types.
    pub fn type_pair_count(&self, edge_type: &str, src_type: &str, dst_type: &str) -> u64 {
        self.sbm_matrix
            .get(edge_type)
            .and_then(|m| m.get(&(src_type.to_string(), dst_type.to_string())))
            .copied()
            .unwrap_or(0)
    }

    /// Total observed edges across all edge types.
    pub fn total_edges(&self) -> u64 {
        self.edge_count.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_node_ids_overwrite_type() {
        let mut stats = GraphStats::new();
        stats.observe_node("n1", "A");
        stats.observe_node("n1", "B");

        assert_eq!(stats.node_type_of("n1"), "B");
        // Tallies are per observation, not per distinct id.
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.node_types["A"], 1);
        assert_eq!(stats.node_types["B"], 1);
    }

    #[test]
    fn unknown_endpoints_count_toward_empty_type() {
        let mut stats = GraphStats::new();
        stats.observe_node("a", "A");
        stats.observe_edge("a", "ghost", "r");

        assert_eq!(stats.type_pair_count("r", "A", ""), 1);
        assert_eq!(stats.out_degrees["r"]["a"], 1);
        assert_eq!(stats.in_degrees["r"]["ghost"], 1);
    }

    #[test]
    fn degrees_accumulate_per_edge_type() {
        let mut stats = GraphStats::new();
        stats.observe_node("a", "A");
        stats.observe_node("b", "A");
        stats.observe_edge("a", "b", "r");
        stats.observe_edge("a", "b", "r");
        stats.observe_edge("b", "a", "s");

        assert_eq!(stats.out_degrees["r"]["a"], 2);
        assert_eq!(stats.in_degrees["r"]["b"], 2);
        assert_eq!(stats.out_degrees["s"]["b"], 1);
        assert_eq!(stats.edge_count["r"], 2);
        assert_eq!(stats.total_edges(), 3);
        assert_eq!(stats.edge_types.len(), 2);
    }
}
