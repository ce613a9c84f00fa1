use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    generate::{self, GenerateArgs},
    inspect::{self, InspectArgs},
    plot::{self, PlotArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "granflow", about = "Granular flow sweep orchestrator and analyser")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every trial of a sweep plan and persist the results.
    Generate(GenerateArgs),
    /// Derive flow-rate statistics and resistance fits from persisted results.
    Plot(PlotArgs),
    /// Summarise the raw engine output of a single trial directory.
    Inspect(InspectArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Generate(args) => generate::run(&args),
        Command::Plot(args) => plot::run(&args),
        Command::Inspect(args) => inspect::run(&args),
    }
}
