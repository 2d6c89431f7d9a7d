//! Program settings, read from a TOML file separate from the scenario inputs.
use crate::log::DEFAULT_LOG_LEVEL;
use crate::optimisation::SolverConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// The default file name for program settings
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Program settings, all optional with sensible defaults
#[derive(Debug, Deserialize, PartialEq)]
pub struct Settings {
    /// The program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Relative MIP gap at which a solution counts as optimal
    #[serde(default = "default_mip_gap")]
    pub mip_gap: f64,
    /// Wall-clock limit per solve in seconds
    #[serde(default = "default_time_limit")]
    pub time_limit: f64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_mip_gap() -> f64 {
    SolverConfig::default().mip_gap
}

fn default_time_limit() -> f64 {
    SolverConfig::default().time_limit
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            mip_gap: default_mip_gap(),
            time_limit: default_time_limit(),
        }
    }
}

impl Settings {
    /// Read settings from the given file, or defaults if the file is missing
    pub fn from_path(path: &Path) -> Result<Settings> {
        if !path.is_file() {
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.to_string_lossy()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Error parsing {}", path.to_string_lossy()))
    }

    /// The solver stopping criteria these settings describe
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            mip_gap: self.mip_gap,
            time_limit: self.time_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        File::create(&path)
            .unwrap()
            .write_all(b"mip_gap = 0.01\n")
            .unwrap();

        let settings = Settings::from_path(&path).unwrap();
        assert_approx_eq!(f64, settings.mip_gap, 0.01);
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_settings_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let settings = Settings::from_path(&dir.path().join(SETTINGS_FILE_NAME)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_settings_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        File::create(&path)
            .unwrap()
            .write_all(b"mip_gap = \"lots\"\n")
            .unwrap();

        assert!(Settings::from_path(&path).is_err());
    }
}
