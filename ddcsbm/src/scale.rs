//! Model rescaling.
//!
//! Multiplying every block coordinate by `s` while dividing every block
//! probability by `s` preserves the expected degree of each node: a node
//! faces `s` times as many candidate endpoints per block, each at `1/s`
//! times the probability.

use anyhow::bail;
use log::warn;

use crate::model::{EdgeBlock, EdgeTypeRecord, Model, NodeBlock, SCALE_KEY};

/// A rescaled model plus the number of probabilities that had to be clamped
/// back to 1 (out of `total_blocks`).
#[derive(Debug)]
pub struct ScaleOutcome {
    pub model: Model,
    pub failed_blocks: u64,
    pub total_blocks: u64,
}

/// Cumulative scale recorded in the meta section, tolerant of a missing or
/// unparsable entry.
fn previous_scale(model: &Model) -> f64 {
    let Some(raw) = model.meta.values.get(SCALE_KEY) else {
        return 1.0;
    };
    match raw.parse::<f64>() {
        Ok(value) => {
            if value <= 0.0 {
                warn!(
                    "the stored {} value '{}' is not positive; the updated scale may be inaccurate",
                    SCALE_KEY, raw
                );
            }
            value
        }
        Err(_) => {
            warn!(
                "could not parse the stored {} value '{}' as a number; assuming 1.0",
                SCALE_KEY, raw
            );
            1.0
        }
    }
}

/// Produce a rescaled copy of `model`. The input is left untouched.
///
/// A non-positive factor is an error. Downscaling (`factor < 1`) is
/// permitted but warned about: probabilities grow by `1/factor` and any
/// value pushed past 1 is clamped and counted as a model failure.
pub fn scale_model(model: &Model, factor: f64) -> anyhow::Result<ScaleOutcome> {
    if !(factor > 0.0) {
        bail!("scale factor must be greater than zero, got {factor}");
    }
    if factor < 1.0 {
        warn!("downscaling a model can distort the resulting graphs; proceed with caution");
    }

    let mut meta = model.meta.clone();
    let new_scale = previous_scale(model) * factor;
    meta.values
        .insert(SCALE_KEY.to_string(), format!("{new_scale:.6}"));

    let nodes = model
        .nodes
        .iter()
        .map(|block| NodeBlock {
            start: block.start * factor,
            end: block.end * factor,
            node_type: block.node_type.clone(),
        })
        .collect();

    let mut failed_blocks: u64 = 0;
    let mut total_blocks: u64 = 0;
    let edges = model
        .edges
        .iter()
        .map(|record| EdgeTypeRecord {
            edge_type: record.edge_type.clone(),
            blocks: record
                .blocks
                .iter()
                .map(|block| {
                    let mut p = block.p / factor;
                    if p > 1.0 {
                        p = 1.0;
                        failed_blocks += 1;
                    }
                    total_blocks += 1;
                    EdgeBlock {
                        x_start: block.x_start * factor,
                        x_end: block.x_end * factor,
                        y_start: block.y_start * factor,
                        y_end: block.y_end * factor,
                        p,
                    }
                })
                .collect(),
        })
        .collect();

    if failed_blocks > 0 {
        warn!(
            "{} out of {} blocks ({:.2}%) remain model failures (p > 1.0) after scaling",
            failed_blocks,
            total_blocks,
            failed_blocks as f64 / total_blocks as f64 * 100.0
        );
    }

    Ok(ScaleOutcome {
        model: Model { meta, nodes, edges },
        failed_blocks,
        total_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Meta;

    fn one_block_model(p: f64) -> Model {
        Model {
            meta: Meta {
                name: "test".into(),
                values: Default::default(),
            },
            nodes: vec![NodeBlock {
                start: 0.0,
                end: 2.0,
                node_type: "X".into(),
            }],
            edges: vec![EdgeTypeRecord {
                edge_type: "e".into(),
                blocks: vec![EdgeBlock {
                    x_start: 0.0,
                    x_end: 2.0,
                    y_start: 0.0,
                    y_end: 2.0,
                    p,
                }],
            }],
        }
    }

    #[test]
    fn non_positive_factor_is_rejected() {
        let model = one_block_model(0.5);
        assert!(scale_model(&model, 0.0).is_err());
        assert!(scale_model(&model, -2.0).is_err());
        assert!(scale_model(&model, f64::NAN).is_err());
    }

    #[test]
    fn scaling_multiplies_coordinates_and_divides_probability() {
        let model = one_block_model(0.5);
        let out = scale_model(&model, 2.0).unwrap();

        assert_eq!(out.model.nodes[0].start, 0.0);
        assert_eq!(out.model.nodes[0].end, 4.0);
        let block = &out.model.edges[0].blocks[0];
        assert_eq!(block.x_end, 4.0);
        assert_eq!(block.y_end, 4.0);
        assert_eq!(block.p, 0.25);
        assert_eq!(out.failed_blocks, 0);
        assert_eq!(out.total_blocks, 1);
        assert_eq!(out.model.meta.scale(), "2.000000");
        // The input model is left as it was.
        assert_eq!(model.edges[0].blocks[0].p, 0.5);
    }

    #[test]
    fn downscaling_clamps_and_counts_failures() {
        let model = one_block_model(0.5);
        let out = scale_model(&model, 0.25).unwrap();

        assert_eq!(out.model.edges[0].blocks[0].p, 1.0);
        assert_eq!(out.failed_blocks, 1);
        assert_eq!(out.model.meta.scale(), "0.250000");
    }

    #[test]
    fn scale_meta_accumulates_across_scalings() {
        let model = one_block_model(0.5);
        let once = scale_model(&model, 2.0).unwrap().model;
        let twice = scale_model(&once, 3.0).unwrap().model;
        assert_eq!(twice.meta.scale(), "6.000000");
    }

    #[test]
    fn unparsable_scale_meta_falls_back_to_one() {
        let mut model = one_block_model(0.5);
        model
            .meta
            .values
            .insert(SCALE_KEY.into(), "not-a-number".into());
        let out = scale_model(&model, 2.0).unwrap();
        assert_eq!(out.model.meta.scale(), "2.000000");
    }

    #[test]
    fn expected_degree_is_preserved_exactly_for_power_of_two_factors() {
        let model = one_block_model(0.5);
        let out = scale_model(&model, 2.0).unwrap().model;

        let before = &model.edges[0].blocks[0];
        let after = &out.edges[0].blocks[0];
        let len_before = before.x_end - before.x_start;
        let len_after = after.x_end - after.x_start;
        assert_eq!(before.p * len_before, after.p * len_after);
    }
}
