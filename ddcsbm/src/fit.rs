//! Model fitting: turns accumulated graph statistics into a block model.
//!
//! Every node type receives one contiguous interval on the continuous id
//! axis. For every edge type and every ordered pair of node types, the
//! observed out- and in-degree histograms are laid side by side, and each
//! pair of degree bands becomes one rectangular probability block with
//!
//! ```text
//! p = m * (d_out / sum_out) * (d_in / sum_in)
//! ```
//!
//! where `m` is the observed edge count between the two types. Observed-type
//! maps iterate in hash order, so node and edge types are sorted
//! lexicographically before any seeded shuffle; the same seed then yields
//! the same model on every run.

use std::collections::BTreeMap;

use log::{info, warn};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::model::{EdgeBlock, EdgeType, EdgeTypeRecord, Meta, Model, NodeBlock, NodeType};
use crate::stats::GraphStats;

/// Default model name when the caller supplies none.
const UNNAMED_MODEL: &str = "Unnamed graph model";

/// A fitted model plus fit-time diagnostics.
///
/// `failed_blocks` counts blocks whose computed probability exceeded 1 (a
/// model failure: recorded and kept as computed, never clamped here);
/// `total_blocks` counts all emitted blocks across all edge types.
#[derive(Debug)]
pub struct FitOutcome {
    pub model: Model,
    pub failed_blocks: u64,
    pub total_blocks: u64,
}

/// Degree histograms of one (node type, edge type) pair.
///
/// Histogram entries are `(degree, number_of_nodes_at_that_degree)` bands.
/// Nodes of the type that never appear as an endpoint for the edge type are
/// padded in as a zero-degree band so every band sequence accounts for the
/// full node count.
#[derive(Debug, Default)]
struct DegreeProfile {
    in_hist: Vec<(u64, u64)>,
    out_hist: Vec<(u64, u64)>,
    sum_in: u64,
    sum_out: u64,
    n_in: u64,
    n_out: u64,
}

/// One node type with its interval start and per-edge-type degree profiles.
#[derive(Debug)]
struct TypeLayout {
    node_type: NodeType,
    start: u64,
    profiles: BTreeMap<EdgeType, DegreeProfile>,
}

/// Collect a degree histogram into sorted `(degree, amount)` bands, padding
/// with a zero-degree band when fewer than `node_count` nodes were counted.
fn padded_histogram(counts: &BTreeMap<u64, u64>, node_count: u64) -> Vec<(u64, u64)> {
    let mut bands: Vec<(u64, u64)> = counts.iter().map(|(&d, &a)| (d, a)).collect();
    let counted: u64 = bands.iter().map(|&(_, a)| a).sum();
    if counted < node_count {
        bands.push((0, node_count - counted));
    }
    bands.sort_unstable();
    bands
}

/// Bucket per-node degrees by the node's recorded type.
fn degree_distribution(
    per_node: &fnv::FnvHashMap<EdgeType, fnv::FnvHashMap<String, u64>>,
    stats: &GraphStats,
) -> BTreeMap<(NodeType, EdgeType), BTreeMap<u64, u64>> {
    let mut dist: BTreeMap<(NodeType, EdgeType), BTreeMap<u64, u64>> = BTreeMap::new();
    for (edge_type, nodes) in per_node {
        for (node, &degree) in nodes {
            let node_type = stats.node_type_of(node).to_string();
            *dist
                .entry((node_type, edge_type.clone()))
                .or_default()
                .entry(degree)
                .or_default() += 1;
        }
    }
    dist
}

/// Fit a block model from accumulated statistics.
///
/// Meta keys are uppercased; `NAME` becomes the model name and `SCALE`
/// starts at `1.0` unless the caller overrides it. The seed drives the
/// histogram shuffles, so equal inputs and seeds produce equal models.
/// Empty input yields an empty, valid model.
pub fn fit_stats(stats: &GraphStats, meta: &BTreeMap<String, String>, seed: u64) -> FitOutcome {
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut node_types: Vec<NodeType> = stats.node_types.keys().cloned().collect();
    node_types.sort_unstable();
    let mut edge_types: Vec<EdgeType> = stats.edge_types.iter().cloned().collect();
    edge_types.sort_unstable();

    info!(
        "fitting model over {} node type(s) and {} edge type(s)",
        node_types.len(),
        edge_types.len()
    );

    let in_dist = degree_distribution(&stats.in_degrees, stats);
    let out_dist = degree_distribution(&stats.out_degrees, stats);

    // Build the degree profiles and lay the node types out on the continuous
    // axis in one sorted pass, so interval starts and shuffle order agree.
    let empty = BTreeMap::new();
    let mut layouts: Vec<TypeLayout> = Vec::with_capacity(node_types.len());
    let mut nodes: Vec<NodeBlock> = Vec::with_capacity(node_types.len());
    let mut cursor: u64 = 0;
    for node_type in &node_types {
        let node_count = stats.node_types[node_type];
        let mut profiles = BTreeMap::new();
        for edge_type in &edge_types {
            let key = (node_type.clone(), edge_type.clone());
            let mut profile = DegreeProfile {
                in_hist: padded_histogram(in_dist.get(&key).unwrap_or(&empty), node_count),
                out_hist: padded_histogram(out_dist.get(&key).unwrap_or(&empty), node_count),
                ..DegreeProfile::default()
            };
            for &(degree, amount) in &profile.in_hist {
                profile.sum_in += degree * amount;
                profile.n_in += if degree > 0 { amount } else { 0 };
            }
            for &(degree, amount) in &profile.out_hist {
                profile.sum_out += degree * amount;
                profile.n_out += if degree > 0 { amount } else { 0 };
            }
            // The sort above fixes a canonical order; the shuffle then
            // randomizes which degree bands land adjacent to one another.
            profile.in_hist.shuffle(&mut rng);
            profile.out_hist.shuffle(&mut rng);
            profiles.insert(edge_type.clone(), profile);
        }

        nodes.push(NodeBlock {
            start: cursor as f64,
            end: (cursor + node_count) as f64,
            node_type: node_type.clone(),
        });
        layouts.push(TypeLayout {
            node_type: node_type.clone(),
            start: cursor,
            profiles,
        });
        cursor += node_count;
    }

    let mut failed_blocks: u64 = 0;
    let mut total_blocks: u64 = 0;
    let mut edges: Vec<EdgeTypeRecord> = Vec::with_capacity(edge_types.len());

    for edge_type in &edge_types {
        let mut blocks: Vec<EdgeBlock> = Vec::new();
        for x in &layouts {
            let Some(px) = x.profiles.get(edge_type) else {
                continue;
            };
            if px.n_out == 0 {
                continue;
            }
            for y in &layouts {
                let Some(py) = y.profiles.get(edge_type) else {
                    continue;
                };
                if py.n_in == 0 {
                    continue;
                }
                let m = stats.type_pair_count(edge_type, &x.node_type, &y.node_type);
                if m == 0 {
                    continue;
                }

                let mut cx = x.start;
                for &(deg_x, amount_x) in &px.out_hist {
                    let mut cy = y.start;
                    for &(deg_y, amount_y) in &py.in_hist {
                        let p = if px.sum_out > 0 && py.sum_in > 0 {
                            m as f64
                                * (deg_x as f64 / px.sum_out as f64)
                                * (deg_y as f64 / py.sum_in as f64)
                        } else {
                            0.0
                        };
                        if p > 1.0 {
                            failed_blocks += 1;
                        }
                        if p > 0.0 {
                            blocks.push(EdgeBlock {
                                x_start: cx as f64,
                                x_end: (cx + amount_x) as f64,
                                y_start: cy as f64,
                                y_end: (cy + amount_y) as f64,
                                p,
                            });
                            total_blocks += 1;
                        }
                        cy += amount_y;
                    }
                    cx += amount_x;
                }
            }
        }
        blocks.sort_by(|a, b| {
            a.x_start
                .total_cmp(&b.x_start)
                .then(a.y_start.total_cmp(&b.y_start))
        });
        edges.push(EdgeTypeRecord {
            edge_type: edge_type.clone(),
            blocks,
        });
    }

    edges.sort_by(|a, b| a.edge_type.cmp(&b.edge_type));
    nodes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

    let mut model_meta = Meta {
        name: UNNAMED_MODEL.to_string(),
        values: BTreeMap::new(),
    };
    model_meta
        .values
        .insert(crate::model::SCALE_KEY.to_string(), "1.0".to_string());
    for (key, value) in meta {
        let key = key.to_uppercase();
        if key == "NAME" {
            model_meta.name = value.clone();
        } else {
            model_meta.values.insert(key, value.clone());
        }
    }

    if failed_blocks > 0 {
        warn!(
            "model failure (p > 1.0) on {} out of {} blocks ({:.2}%)",
            failed_blocks,
            total_blocks,
            failed_blocks as f64 / total_blocks as f64 * 100.0
        );
    }

    FitOutcome {
        model: Model {
            meta: model_meta,
            nodes,
            edges,
        },
        failed_blocks,
        total_blocks,
    }
}

/// Fit a block model straight from node and edge streams.
///
/// Node items are `(id, node_type)`, edge items `(src, dst, edge_type)`.
pub fn fit<N, E>(nodes: N, edges: E, meta: &BTreeMap<String, String>, seed: u64) -> FitOutcome
where
    N: IntoIterator<Item = (String, String)>,
    E: IntoIterator<Item = (String, String, String)>,
{
    let mut stats = GraphStats::new();
    for (id, node_type) in nodes {
        stats.observe_node(&id, &node_type);
    }
    for (src, dst, edge_type) in edges {
        stats.observe_edge(&src, &dst, &edge_type);
    }
    fit_stats(&stats, meta, seed)
}
