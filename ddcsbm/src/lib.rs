//! Directed degree-corrected stochastic block models (DDcSBM) for synthetic
//! benchmark graphs.
//!
//! A model is fitted from a stream of typed nodes and typed directed edges:
//! per-type degree histograms and a type-to-type edge-count matrix become a
//! set of rectangular probability blocks over a continuous node-id axis.
//! The fitted model can be rescaled by any positive factor while preserving
//! expected per-node degrees, serialized to a plain text format, and sampled
//! into concrete node/edge files.
//!
//! ```no_run
//! use std::collections::BTreeMap;
//!
//! let nodes = vec![("a".to_string(), "user".to_string())];
//! let edges: Vec<(String, String, String)> = vec![];
//! let fitted = ddcsbm::fit(nodes, edges, &BTreeMap::new(), 42);
//! let doubled = ddcsbm::scale_model(&fitted.model, 2.0)?;
//! ddcsbm::generate(&doubled.model, "nodes.tsv", "edges.tsv", 42)?;
//! # anyhow::Ok(())
//! ```

/// Model data structures: node blocks, edge blocks, meta records
pub mod model;

/// Accumulated degree and type statistics of an observed graph
pub mod stats;

/// Fitting statistics into a block model
pub mod fit;

/// Rescaling a model while preserving expected degrees
pub mod scale;

/// Sampling graph instances via geometric skips
pub mod sample;

/// Reading and writing the textual model format
pub mod codec;

pub use codec::{read_model, write_model};
pub use fit::{fit, fit_stats, FitOutcome};
pub use model::{EdgeBlock, EdgeType, EdgeTypeRecord, Meta, Model, NodeBlock, NodeType};
pub use sample::generate;
pub use scale::{scale_model, ScaleOutcome};
pub use stats::GraphStats;
