mod fit_tsv;
mod gen_graphs;
mod rescale;
mod run_script;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fit_tsv::*;
use gen_graphs::*;
use rescale::*;
use run_script::*;

/// Synthetic benchmark graphs from degree-corrected stochastic block models
///
/// Fit a block model from tab-separated node and edge files, rescale it to
/// any size while preserving expected degrees, and sample new graph
/// instances from it. Model files are plain text and can be passed between
/// the subcommands or edited by hand.
#[derive(Parser)]
#[command(name = "graphgen", version, about, long_about, term_width = 80)]
struct Cli {
    #[arg(short = 'v', long, global = true, help = "Log progress to stderr")]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// fit a block model from tab-separated node and edge files
    Fit(FitArgs),
    /// rescale a model file by a positive factor
    Scale(ScaleArgs),
    /// sample graph instances from a model file
    Generate(GenerateArgs),
    /// execute an instruction script with optional template substitution
    Run(RunArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match &cli.commands {
        Commands::Fit(args) => {
            fit_tsv(args)?;
        }
        Commands::Scale(args) => {
            rescale(args)?;
        }
        Commands::Generate(args) => {
            gen_graphs(args)?;
        }
        Commands::Run(args) => {
            run_script(args)?;
        }
    }

    Ok(())
}
