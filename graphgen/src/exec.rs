//! Instruction execution.
//!
//! The executor owns the single active model and a parent seed PRNG. Every
//! fit or generation draws a fresh sub-seed from the parent, so one `-seed`
//! instruction pins the whole remainder of a run. `-execute` splices the
//! sub-script's instructions right after the current one, which lets
//! scripts compose without any call-stack machinery.

use std::collections::VecDeque;
use std::hash::Hasher;
use std::path::Path;

use anyhow::{anyhow, Context};
use ddcsbm::{codec, fit, sample, scale, GraphStats, Model};
use fnv::FnvHasher;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::script::{self, Instruction};
use crate::tsv::{self, TsvConfig};

/// Counters reported after a run.
#[derive(Debug, Default)]
pub struct ExecSummary {
    pub instructions_run: usize,
    pub scripts_run: usize,
    pub graphs_generated: usize,
}

/// Executes instruction streams against one active model.
pub struct Executor {
    active: Option<Model>,
    seeds: StdRng,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// An executor seeded from OS entropy.
    pub fn new() -> Self {
        Executor {
            active: None,
            seeds: StdRng::from_os_rng(),
        }
    }

    /// An executor with a reproducible parent seed.
    pub fn seeded(seed: u64) -> Self {
        Executor {
            active: None,
            seeds: StdRng::seed_from_u64(seed),
        }
    }

    /// The currently active model, if any.
    pub fn active_model(&self) -> Option<&Model> {
        self.active.as_ref()
    }

    fn require_model(&self, action: &str) -> anyhow::Result<&Model> {
        self.active.as_ref().ok_or_else(|| {
            anyhow!("a model needs to be active before it can be {action}; use -read or -load first")
        })
    }

    /// Run a stream of instructions to completion.
    pub fn run(&mut self, instructions: Vec<Instruction>) -> anyhow::Result<ExecSummary> {
        let mut queue: VecDeque<Instruction> = instructions.into();
        let mut summary = ExecSummary::default();

        while let Some(instruction) = queue.pop_front() {
            match instruction {
                Instruction::Read(read) => {
                    info!("reading graph data");
                    let config = TsvConfig {
                        node_files: read.node_files,
                        edge_files: read.edge_files,
                        node_id_col: read.node_id_col,
                        node_type_cols: read.node_type_cols,
                        source_col: read.source_col,
                        target_col: read.target_col,
                        edge_type_cols: read.edge_type_cols,
                    };
                    let mut stats = GraphStats::new();
                    tsv::read_graph(&config, &mut stats)?;
                    let outcome = fit::fit_stats(&stats, &read.meta, self.seeds.random());
                    info!(
                        "fitted model '{}' with {} block(s)",
                        outcome.model.meta.name, outcome.total_blocks
                    );
                    self.active = Some(outcome.model);
                }
                Instruction::Execute(execute) => {
                    info!("running script '{}'", execute.script_path);
                    let text = std::fs::read_to_string(&execute.script_path).with_context(
                        || format!("could not open script file '{}'", execute.script_path),
                    )?;
                    let tokens = script::tokenize(&text, &execute.replacements)?;
                    for sub_instruction in script::parse(&tokens)?.into_iter().rev() {
                        queue.push_front(sub_instruction);
                    }
                    summary.scripts_run += 1;
                }
                Instruction::Load { path } => {
                    info!("reading model from '{path}'");
                    let model = codec::read_model(&path)?;
                    info!("active model: {}", model.meta.name);
                    self.active = Some(model);
                }
                Instruction::Save { path } => {
                    let model = self.require_model("saved to a file")?;
                    info!("saving model '{}' to '{path}'", model.meta.name);
                    let bytes = codec::write_model(&path, model)?;
                    info!("wrote {bytes} bytes to the file");
                }
                Instruction::Scale { factor } => {
                    let model = self.require_model("scaled")?;
                    info!("scaling model by a factor of x{factor}");
                    let outcome = scale::scale_model(model, factor)?;
                    info!("new scale: x{} of the original", outcome.model.meta.scale());
                    self.active = Some(outcome.model);
                }
                Instruction::Seed { phrase } => {
                    info!("setting the random seed to '{phrase}'");
                    let mut hasher = FnvHasher::default();
                    hasher.write(phrase.as_bytes());
                    self.seeds = StdRng::seed_from_u64(hasher.finish());
                }
                Instruction::Generate(generate) => {
                    // Draw every sub-seed up front; borrowing the model below
                    // freezes `self`.
                    let seeds: Vec<u64> =
                        (0..generate.count).map(|_| self.seeds.random()).collect();
                    let model = self.require_model("generated from")?;
                    info!(
                        "generating {} new graph(s) at x{} scale",
                        generate.count,
                        model.meta.scale()
                    );
                    if generate.count == 1 {
                        sample::generate(
                            model,
                            &generate.node_path,
                            &generate.edge_path,
                            seeds[0],
                        )?;
                        summary.graphs_generated += 1;
                    } else {
                        for (index, seed) in seeds.into_iter().enumerate() {
                            let node_path = numbered_path(&generate.node_path, index);
                            let edge_path = numbered_path(&generate.edge_path, index);
                            info!("{}.) at '{node_path}' and '{edge_path}'", index + 1);
                            sample::generate(model, &node_path, &edge_path, seed)?;
                            summary.graphs_generated += 1;
                        }
                    }
                }
                Instruction::Help => print_help(),
            }
            summary.instructions_run += 1;
        }

        Ok(summary)
    }
}

/// Derive `path/to/name_<index>.ext` from `path/to/name.ext`.
pub fn numbered_path(path: &str, index: usize) -> String {
    let path = Path::new(path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            format!("{}/{stem}_{index}{extension}", parent.display())
        }
        _ => format!("{stem}_{index}{extension}"),
    }
}

fn print_help() {
    println!("Use double quotations (\"...\") to retain whitespace within an argument.");
    println!("Instructions are not case-sensitive.");
    println!();
    println!("### Read tab-separated files and fit an active model in memory.");
    println!("    -read");
    println!("        +nodefile [nodefile_path1] [nodefile_path2] ...");
    println!("        +edgefile [edgefile_path1] [edgefile_path2] ...");
    println!("        +nodeindex [column_of_node_id]");
    println!("        +nodetypeindex [column_of_node_type1] [column_of_node_type2] ...");
    println!("        +edgeindex [column_of_source_id] [column_of_target_id]");
    println!("        +edgetypeindex [column_of_edge_type1] [column_of_edge_type2] ...");
    println!("        +arg [KEY] [VALUE]");
    println!();
    println!("### Execute a script, substituting template/replacement pairs first.");
    println!("    -execute [path_to_script] [template1] [replacement1] ...");
    println!();
    println!("### Load a model file and set it as the active model.");
    println!("    -load [path_to_model_file]");
    println!();
    println!("### Save the active model to a file.");
    println!("    -save [model_save_path]");
    println!();
    println!("### Scale the active model by a positive factor.");
    println!("    -scale [scaling_factor]");
    println!();
    println!("### Seed the PRNG used for fitting and generation from here on.");
    println!("    -seed [seed_string]");
    println!();
    println!("### Generate n graphs from the active model at its current scale.");
    println!("    -generate [node_file_path] [edge_file_path] [number_of_graphs]");
    println!();
    println!("### Display this documentation.");
    println!("    -help");
}
