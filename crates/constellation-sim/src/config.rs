//! Run configuration, loaded from JSON.
//!
//! Field names mirror the historical configuration documents so
//! recorded scenarios keep loading unchanged.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use grid_routing::{DelayModel, GridConfig};
use serde::Deserialize;

use crate::{Result, SimError};

#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Scenario name, used in report file names.
    pub name: String,
    pub constellation: ConstellationSection,
    #[serde(rename = "ISL_latency")]
    pub isl_latency: LatencySection,
    /// Epoch length in seconds of simulated time.
    pub step_length: u64,
    /// Total simulated time covered by the input files.
    pub duration: u64,
    #[serde(default)]
    pub start_time: u64,
    /// Route-table recompute interval; defaults to the full duration
    /// (compute once).
    pub update_period: Option<u64>,
    /// Report emission interval; defaults to the update period.
    pub refresh_period: Option<u64>,
    pub isl_state_dir: PathBuf,
    pub sat_position_dir: PathBuf,
    #[serde(default)]
    pub sat_lla_dir: Option<PathBuf>,
    #[serde(default)]
    pub sat_velocity_dir: Option<PathBuf>,
    pub report_dir: PathBuf,
    pub observer_config_path: PathBuf,
    /// Nodes whose route rows are dumped on every recompute.
    #[serde(default)]
    pub dump_rib_nodes: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ConstellationSection {
    pub num_of_orbit_planes: usize,
    pub num_of_satellites_per_plane: usize,
    pub relative_spacing: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatencySection {
    pub processing_delay: f64,
    pub propagation_delay_coef: f64,
    pub propagation_speed: f64,
}

impl SimConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let config: SimConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.step_length == 0 {
            return Err(SimError::Config("step_length must be positive".into()));
        }
        if self.duration == 0 {
            return Err(SimError::Config("duration must be positive".into()));
        }
        if self.update_period == Some(0) || self.refresh_period == Some(0) {
            return Err(SimError::Config(
                "update_period and refresh_period must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn grid(&self) -> Result<GridConfig> {
        GridConfig::new(
            self.constellation.num_of_orbit_planes,
            self.constellation.num_of_satellites_per_plane,
            self.constellation.relative_spacing,
        )
        .map_err(Into::into)
    }

    pub fn delay_model(&self) -> DelayModel {
        DelayModel {
            processing_delay_ms: self.isl_latency.processing_delay,
            propagation_coef: self.isl_latency.propagation_delay_coef,
            propagation_speed: self.isl_latency.propagation_speed,
        }
    }

    pub fn update_period(&self) -> u64 {
        self.update_period.unwrap_or(self.duration)
    }

    pub fn refresh_period(&self) -> u64 {
        self.refresh_period.unwrap_or_else(|| self.update_period())
    }

    /// First epoch past the end of the run.
    pub fn end_time(&self) -> u64 {
        self.start_time + self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_json() -> &'static str {
        r#"{
            "name": "unit",
            "constellation": {
                "num_of_orbit_planes": 4,
                "num_of_satellites_per_plane": 4,
                "relative_spacing": 0
            },
            "ISL_latency": {
                "processing_delay": 1.0,
                "propagation_delay_coef": 1.0,
                "propagation_speed": 299792.458
            },
            "step_length": 1,
            "duration": 10,
            "isl_state_dir": "isl",
            "sat_position_dir": "pos",
            "report_dir": "reports",
            "observer_config_path": "observers.txt"
        }"#
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(minimal_json().as_bytes()).unwrap();

        let config = SimConfig::from_file(file.path()).unwrap();
        assert_eq!(config.name, "unit");
        assert_eq!(config.start_time, 0);
        assert_eq!(config.update_period(), 10);
        assert_eq!(config.refresh_period(), 10);
        assert_eq!(config.end_time(), 10);
        assert!(config.sat_lla_dir.is_none());
        assert!(config.dump_rib_nodes.is_empty());

        let grid = config.grid().unwrap();
        assert_eq!(grid.node_count(), 16);
    }

    #[test]
    fn refresh_defaults_to_update_period() {
        let json = minimal_json().replace("\"duration\": 10", "\"duration\": 10, \"update_period\": 5");
        let config: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.update_period(), 5);
        assert_eq!(config.refresh_period(), 5);
    }

    #[test]
    fn rejects_zero_step_length() {
        let json = minimal_json().replace("\"step_length\": 1", "\"step_length\": 0");
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        assert!(SimConfig::from_file(file.path()).is_err());
    }
}
