//! The command line interface for the program.
use crate::input::load_scenario;
use crate::log;
use crate::model::{HubModel, TemporalResolution};
use crate::optimisation::{OptimisationMode, Orchestrator};
use crate::output::{DataWriter, create_output_directory};
use crate::settings::{SETTINGS_FILE_NAME, Settings};
use ::log::info;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The available commands.
    #[command(subcommand)]
    pub command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario.
    Run {
        /// Path to the scenario TOML file.
        scenario_file: PathBuf,
        /// Objective mode: "cost", "carbon" or "multi".
        #[arg(long, default_value = "cost")]
        mode: String,
        /// Number of intermediate Pareto points in "multi" mode.
        #[arg(long, default_value_t = 0)]
        pareto_points: u32,
        /// Storage coupling: "typical-days" or "full-horizon".
        #[arg(long, default_value = "typical-days")]
        temporal: String,
        /// Directory to write results to.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn parse_mode(mode: &str, pareto_points: u32) -> Result<OptimisationMode> {
    match mode {
        "cost" => Ok(OptimisationMode::CostOnly),
        "carbon" => Ok(OptimisationMode::CarbonOnly),
        "multi" => Ok(OptimisationMode::MultiObjective { pareto_points }),
        unknown => bail!("Unknown optimisation mode: {}", unknown),
    }
}

fn parse_temporal(temporal: &str) -> Result<TemporalResolution> {
    match temporal {
        "typical-days" => Ok(TemporalResolution::TypicalDays),
        "full-horizon" => Ok(TemporalResolution::FullHorizon),
        unknown => bail!("Unknown temporal resolution: {}", unknown),
    }
}

/// Handle the `run` command.
///
/// The built MILP covers every investment stage of the calendar, so one
/// scenario regeneration and one orchestrated run cover the whole horizon.
pub fn handle_run_command(
    scenario_file: &Path,
    mode: &str,
    pareto_points: u32,
    temporal: &str,
    output_dir: &Path,
) -> Result<()> {
    let mode = parse_mode(mode, pareto_points)?;
    let temporal = parse_temporal(temporal)?;

    let settings_path = scenario_file
        .parent()
        .unwrap_or(Path::new("."))
        .join(SETTINGS_FILE_NAME);
    let settings = Settings::from_path(&settings_path)?;
    create_output_directory(output_dir).context("Failed to create output directory.")?;
    log::init(Some(&settings.log_level), Some(output_dir))
        .context("Failed to initialize logging.")?;

    let builder = load_scenario(scenario_file).context("Failed to load scenario.")?;
    info!("Scenario loaded successfully.");

    let scenario = builder.for_stage(1)?;
    let model = HubModel::new(&scenario, temporal);
    let orchestrator = Orchestrator::new(&model, mode, settings.solver_config());
    let points = orchestrator.run();

    let mut writer = DataWriter::create(output_dir)?;
    for point in &points {
        writer.write_point(point)?;
    }
    writer.flush()?;
    info!("Results written to {}", output_dir.to_string_lossy());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("cost", 0).unwrap(), OptimisationMode::CostOnly);
        assert_eq!(
            parse_mode("multi", 3).unwrap(),
            OptimisationMode::MultiObjective { pareto_points: 3 }
        );
        assert!(parse_mode("fastest", 0).is_err());
    }

    #[test]
    fn test_parse_temporal() {
        assert_eq!(
            parse_temporal("full-horizon").unwrap(),
            TemporalResolution::FullHorizon
        );
        assert!(parse_temporal("hourly").is_err());
    }
}
