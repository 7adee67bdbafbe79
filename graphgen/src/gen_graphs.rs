use anyhow::Result;
use clap::Args;
use rand::Rng;

use graphgen::exec::Executor;
use graphgen::script::{GenerateInstruction, Instruction};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(short, long, help = "Model file to sample from")]
    pub model: String,

    #[arg(long, help = "Output node file; gets an _i suffix when count > 1")]
    pub node_output: String,

    #[arg(long, help = "Output edge file; gets an _i suffix when count > 1")]
    pub edge_output: String,

    #[arg(short, long, default_value = "1", help = "Number of graph instances")]
    pub count: usize,

    #[arg(long, help = "Seed for the samplers (default: OS entropy)")]
    pub seed: Option<u64>,
}

pub fn gen_graphs(args: &GenerateArgs) -> Result<()> {
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    let mut executor = Executor::seeded(seed);
    executor.run(vec![
        Instruction::Load {
            path: args.model.clone(),
        },
        Instruction::Generate(GenerateInstruction {
            node_path: args.node_output.clone(),
            edge_path: args.edge_output.clone(),
            count: args.count,
        }),
    ])?;
    Ok(())
}
