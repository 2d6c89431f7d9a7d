//! Provides the main entry point to the program.
use anyhow::Result;
use clap::Parser;
use hubplan::commands::{Cli, Commands, handle_run_command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario_file,
            mode,
            pareto_points,
            temporal,
            output_dir,
        } => handle_run_command(&scenario_file, &mode, pareto_points, &temporal, &output_dir),
    }
}
