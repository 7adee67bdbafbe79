use anyhow::{anyhow, Result};
use clap::Args;
use log::info;
use rand::Rng;

use graphgen::exec::Executor;
use graphgen::script::{Instruction, ReadInstruction};

#[derive(Args, Debug)]
pub struct FitArgs {
    #[arg(long, required = true, help = "Tab-separated node file(s), id and type columns")]
    pub node_file: Vec<String>,

    #[arg(long, required = true, help = "Tab-separated edge file(s), endpoint and type columns")]
    pub edge_file: Vec<String>,

    #[arg(long, default_value = "0", help = "Column holding the unique node id")]
    pub node_id_col: usize,

    #[arg(long, help = "Column(s) composing the node type (default: 1)")]
    pub node_type_col: Vec<usize>,

    #[arg(long, default_value = "0", help = "Column holding the edge's source node id")]
    pub source_col: usize,

    #[arg(long, default_value = "1", help = "Column holding the edge's target node id")]
    pub target_col: usize,

    #[arg(long, help = "Column(s) composing the edge type (default: 2)")]
    pub edge_type_col: Vec<usize>,

    #[arg(
        long,
        help = "Extra KEY=VALUE meta entries for the model; NAME sets the model name"
    )]
    pub arg: Vec<String>,

    #[arg(long, help = "Seed for the fit-time shuffles (default: OS entropy)")]
    pub seed: Option<u64>,

    #[arg(short, long, help = "Output model file")]
    pub output: String,
}

pub fn fit_tsv(args: &FitArgs) -> Result<()> {
    let mut read = ReadInstruction {
        node_files: args.node_file.clone(),
        edge_files: args.edge_file.clone(),
        node_id_col: args.node_id_col,
        source_col: args.source_col,
        target_col: args.target_col,
        ..ReadInstruction::default()
    };
    if !args.node_type_col.is_empty() {
        read.node_type_cols = args.node_type_col.clone();
    }
    if !args.edge_type_col.is_empty() {
        read.edge_type_cols = args.edge_type_col.clone();
    }
    for entry in &args.arg {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("meta arguments must look like KEY=VALUE, got '{entry}'"))?;
        read.meta.insert(key.to_uppercase(), value.to_string());
    }

    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    let mut executor = Executor::seeded(seed);
    executor.run(vec![
        Instruction::Read(read),
        Instruction::Save {
            path: args.output.clone(),
        },
    ])?;

    info!("fit completed, model written to '{}'", args.output);
    Ok(())
}
