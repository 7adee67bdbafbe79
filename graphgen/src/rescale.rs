use anyhow::Result;
use clap::Args;
use log::info;

use graphgen::exec::Executor;
use graphgen::script::Instruction;

#[derive(Args, Debug)]
pub struct ScaleArgs {
    #[arg(short, long, help = "Model file to rescale")]
    pub input: String,

    #[arg(short, long, help = "Where to write the rescaled model")]
    pub output: String,

    #[arg(
        short,
        long,
        help = "Positive scale factor; below 1.0 shrinks the graph and is not recommended"
    )]
    pub factor: f64,
}

pub fn rescale(args: &ScaleArgs) -> Result<()> {
    let mut executor = Executor::new();
    executor.run(vec![
        Instruction::Load {
            path: args.input.clone(),
        },
        Instruction::Scale {
            factor: args.factor,
        },
        Instruction::Save {
            path: args.output.clone(),
        },
    ])?;

    info!("rescaled model written to '{}'", args.output);
    Ok(())
}
