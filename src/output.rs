//! Writing of solve results to disk as CSV files.
use crate::model::Objective;
use crate::optimisation::SolvePoint;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::Path;

/// The output file name for solved variable values
const VARIABLES_FILE_NAME: &str = "variables.csv";
/// The output file name for the per-point run summary
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// Create the specified output directory, or raise an error if it is non-empty
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        ensure!(
            output_dir.read_dir()?.next().is_none(),
            "Output directory {} already exists and is not empty",
            output_dir.to_string_lossy()
        );
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// One solved variable value
#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct VariableRow {
    /// The solve point this value belongs to
    point: String,
    /// The variable family name
    family: String,
    /// Semicolon-separated index values of the variable
    indices: String,
    /// Solved value
    value: f64,
}

/// One line of the run summary
#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct SummaryRow {
    point: String,
    objective: String,
    status: String,
    carbon_cap: Option<f64>,
    total_cost: Option<f64>,
    total_carbon: Option<f64>,
}

fn objective_name(objective: Objective) -> &'static str {
    match objective {
        Objective::Cost => "cost",
        Objective::Carbon => "carbon",
    }
}

/// Writes the results of a run to disk as they become available
pub struct DataWriter {
    variables_writer: csv::Writer<File>,
    summary_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files for writing in the given output directory
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(&file_path)
                .with_context(|| format!("Could not create {}", file_path.to_string_lossy()))
        };

        Ok(Self {
            variables_writer: new_writer(VARIABLES_FILE_NAME)?,
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
        })
    }

    /// Write one solve point: its summary line and, if solved, its variables
    pub fn write_point(&mut self, point: &SolvePoint) -> Result<()> {
        self.summary_writer.serialize(SummaryRow {
            point: point.label.clone(),
            objective: objective_name(point.objective).to_string(),
            status: point.status.to_string(),
            carbon_cap: point.carbon_cap,
            total_cost: point.solution.as_ref().map(|s| s.total_cost()),
            total_carbon: point.solution.as_ref().map(|s| s.total_carbon()),
        })?;

        if let Some(solution) = &point.solution {
            for (key, value) in solution.iter() {
                self.variables_writer.serialize(VariableRow {
                    point: point.label.clone(),
                    family: key.family().to_string(),
                    indices: key.indices(),
                    value,
                })?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.variables_writer.flush()?;
        self.summary_writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::read_vec_from_csv;
    use crate::optimisation::SolveStatus;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory_rejects_non_empty() {
        let dir = tempdir().unwrap();
        create_output_directory(&dir.path().join("results")).unwrap();

        File::create(dir.path().join("stray")).unwrap();
        assert!(create_output_directory(dir.path()).is_err());
    }

    #[test]
    fn test_write_summary_for_failed_point() {
        let dir = tempdir().unwrap();
        let point = SolvePoint {
            label: "cost_min".to_string(),
            objective: Objective::Cost,
            carbon_cap: Some(12.5),
            status: SolveStatus::Infeasible,
            solution: None,
        };

        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer.write_point(&point).unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<SummaryRow> =
            read_vec_from_csv(&dir.path().join(SUMMARY_FILE_NAME)).unwrap();
        assert_eq!(
            rows,
            vec![SummaryRow {
                point: "cost_min".to_string(),
                objective: "cost".to_string(),
                status: "infeasible".to_string(),
                carbon_cap: Some(12.5),
                total_cost: None,
                total_carbon: None,
            }]
        );
    }
}
