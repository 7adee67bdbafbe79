//! Textual model-file codec.
//!
//! The format is line-oriented with three section kinds:
//!
//! ```text
//! # META
//! NAME=my graph
//! SCALE=1.0
//!
//! # NODES
//! 0,3,user
//! 3,5,item
//!
//! # EDGES=rates
//! 0,1,3,4,0.25
//! ```
//!
//! Blank lines and trailing carriage returns are ignored. Incomplete or
//! unparsable data lines are skipped with a diagnostic; an unknown `#`
//! directive or a missing META/NODES/EDGES section is fatal.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use anyhow::{bail, Context};
use log::{info, warn};

use crate::model::{EdgeBlock, EdgeTypeRecord, Model, NodeBlock};

#[derive(Clone, Copy)]
enum Section {
    None,
    Meta,
    Nodes,
    Edges,
}

/// Read a model file.
pub fn read_model(path: &str) -> anyhow::Result<Model> {
    let file = File::open(path).with_context(|| format!("failed to open model file '{path}'"))?;
    let reader = BufReader::new(file);

    let mut model = Model::default();
    let mut section = Section::None;
    let mut current_type = String::new();
    let mut current_blocks: Vec<EdgeBlock> = Vec::new();
    let mut has_meta = false;
    let mut has_nodes = false;
    let mut has_edges = false;

    for line in reader.lines() {
        let mut line = line?;
        if line.ends_with('\r') {
            line.pop();
        }
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            if line.starts_with("# META") {
                section = Section::Meta;
            } else if line.starts_with("# NODES") {
                section = Section::Nodes;
            } else if line.starts_with("# EDGES") {
                section = Section::Edges;
                if !current_blocks.is_empty() {
                    model.edges.push(EdgeTypeRecord {
                        edge_type: std::mem::take(&mut current_type),
                        blocks: std::mem::take(&mut current_blocks),
                    });
                    has_edges = true;
                }
                let Some((_, edge_type)) = line.split_once('=') else {
                    bail!("the EDGES directive in '{path}' names no edge type: '{line}'");
                };
                current_type = edge_type.to_string();
                current_blocks = Vec::new();
            } else {
                bail!("encountered unexpected directive '{line}' while parsing model file '{path}'");
            }
            continue;
        }

        match section {
            Section::None => {
                bail!("encountered line '{line}' before any section header in model file '{path}'")
            }
            Section::Meta => match line.split_once('=') {
                Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                    if key == "NAME" {
                        model.meta.name = value.to_string();
                        has_meta = true;
                    } else {
                        model.meta.values.insert(key.to_string(), value.to_string());
                    }
                }
                _ => warn!("skipping incomplete META line '{line}' in '{path}'"),
            },
            Section::Nodes => {
                let mut fields = line.splitn(3, ',');
                match (fields.next(), fields.next(), fields.next()) {
                    (Some(start), Some(end), Some(node_type))
                        if !start.is_empty() && !end.is_empty() && !node_type.is_empty() =>
                    {
                        match (start.trim().parse::<f64>(), end.trim().parse::<f64>()) {
                            (Ok(start), Ok(end)) => {
                                model.nodes.push(NodeBlock {
                                    start,
                                    end,
                                    node_type: node_type.to_string(),
                                });
                                has_nodes = true;
                            }
                            _ => warn!(
                                "could not parse NODES line '{line}' in '{path}'; skipping"
                            ),
                        }
                    }
                    _ => warn!("skipping incomplete NODES line '{line}' in '{path}'"),
                }
            }
            Section::Edges => {
                let fields: Vec<&str> = line.splitn(5, ',').collect();
                if fields.len() < 5 || fields.iter().any(|f| f.is_empty()) {
                    warn!("skipping incomplete EDGES line '{line}' in '{path}'");
                    continue;
                }
                let parsed = (
                    fields[0].trim().parse::<f64>(),
                    fields[1].trim().parse::<f64>(),
                    fields[2].trim().parse::<f64>(),
                    fields[3].trim().parse::<f64>(),
                    fields[4].trim().parse::<f64>(),
                );
                match parsed {
                    (Ok(x_start), Ok(x_end), Ok(y_start), Ok(y_end), Ok(p)) => {
                        current_blocks.push(EdgeBlock {
                            x_start,
                            x_end,
                            y_start,
                            y_end,
                            p,
                        });
                    }
                    _ => warn!("could not parse EDGES line '{line}' in '{path}'; skipping"),
                }
            }
        }
    }

    if !current_blocks.is_empty() {
        model.edges.push(EdgeTypeRecord {
            edge_type: current_type,
            blocks: current_blocks,
        });
        has_edges = true;
    }

    if !has_meta {
        bail!("'{path}' is missing a META section with at least a NAME=... entry");
    }
    if !has_nodes {
        bail!("'{path}' is missing a NODES section with at least one node block");
    }
    if !has_edges {
        bail!("'{path}' is missing an EDGES section with at least one block");
    }

    info!(
        "read {} node block(s) and {} edge type(s) from '{path}'",
        model.nodes.len(),
        model.edges.len()
    );
    Ok(model)
}

struct ByteCountWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for ByteCountWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Write a model file, returning the number of bytes written.
///
/// Meta keys may not contain `=`; keys, values, and type names may not
/// contain newlines. Numbers use the default decimal formatting, which the
/// reader round-trips exactly.
pub fn write_model(path: &str, model: &Model) -> anyhow::Result<u64> {
    let file = File::create(path).with_context(|| format!("could not create model file '{path}'"))?;
    let mut out = ByteCountWriter {
        inner: BufWriter::new(file),
        written: 0,
    };

    if model.meta.name.is_empty() {
        warn!("the model being written to '{path}' has no name");
    }
    writeln!(out, "# META")?;
    writeln!(out, "NAME={}", model.meta.name)?;
    for (key, value) in &model.meta.values {
        if key.contains('=') {
            bail!("equal signs are not allowed in meta keys: {{{key}: {value}}}");
        }
        if key.contains('\n') || value.contains('\n') {
            bail!("newlines are not allowed in meta entries: {{{key}: {value}}}");
        }
        writeln!(out, "{key}={value}")?;
    }
    writeln!(out)?;

    writeln!(out, "# NODES")?;
    for block in &model.nodes {
        if block.node_type.contains('\n') {
            bail!(
                "newlines are not allowed in node type names: '{}'",
                block.node_type
            );
        }
        writeln!(out, "{},{},{}", block.start, block.end, block.node_type)?;
    }
    writeln!(out)?;

    for record in &model.edges {
        if record.edge_type.contains('\n') {
            bail!(
                "newlines are not allowed in edge type names: '{}'",
                record.edge_type
            );
        }
        writeln!(out, "# EDGES={}", record.edge_type)?;
        for block in &record.blocks {
            writeln!(
                out,
                "{},{},{},{},{}",
                block.x_start, block.x_end, block.y_start, block.y_end, block.p
            )?;
        }
        writeln!(out)?;
    }

    out.flush()?;
    Ok(out.written)
}
