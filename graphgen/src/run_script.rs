use anyhow::{anyhow, Context, Result};
use clap::Args;
use log::info;

use graphgen::exec::Executor;
use graphgen::script;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(help = "Instruction script to execute")]
    pub script: String,

    #[arg(
        short,
        long,
        help = "TEMPLATE=VALUE pairs substituted into the script before parsing"
    )]
    pub define: Vec<String>,

    #[arg(long, help = "Parent seed for all fitting and generation (default: OS entropy)")]
    pub seed: Option<u64>,
}

pub fn run_script(args: &RunArgs) -> Result<()> {
    let mut replacements = Vec::with_capacity(args.define.len());
    for entry in &args.define {
        let (template, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("defines must look like TEMPLATE=VALUE, got '{entry}'"))?;
        replacements.push((template.to_string(), value.to_string()));
    }

    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("could not open script file '{}'", args.script))?;
    let tokens = script::tokenize(&text, &replacements)?;
    let instructions = script::parse(&tokens)?;

    let mut executor = match args.seed {
        Some(seed) => Executor::seeded(seed),
        None => Executor::new(),
    };
    let summary = executor.run(instructions)?;

    info!(
        "finished: {} instruction(s) run, {} script call(s), {} graph(s) generated",
        summary.instructions_run, summary.scripts_run, summary.graphs_generated
    );
    Ok(())
}
