//! Pipeline configuration
//!
//! Every field has a default, so a config file only needs to name the values
//! it changes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub vehicle: VehicleConfig,
    pub thresholds: ThresholdConfig,
    pub laps: LapDetectionConfig,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}

/// Vehicle constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub driver_mass_kg: f64,
    pub car_mass_kg: f64,
}

impl VehicleConfig {
    /// Driver plus car
    pub fn mass_kg(&self) -> f64 {
        self.driver_mass_kg + self.car_mass_kg
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            driver_mass_kg: 80.0,
            car_mass_kg: 513.0,
        }
    }
}

/// Flag channel thresholds, in units of standard gravity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Braking when longitudinal acceleration is below this
    pub braking_g: f64,
    /// Throttle when longitudinal acceleration is above this
    pub throttle_g: f64,
    /// Cornering when |lateral acceleration| is above this
    pub cornering_g: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            braking_g: -0.15,
            throttle_g: 0.05,
            cornering_g: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LapDetectionConfig {
    /// Clustering radius and start/finish proximity, in meters
    pub radius_m: f64,
    /// Minimum points for a dense cluster (a point counts itself)
    pub min_cluster_size: usize,
    /// Debounce between lap boundaries, in seconds
    pub min_lap_seconds: f64,
}

impl LapDetectionConfig {
    pub fn radius_km(&self) -> f64 {
        self.radius_m / 1000.0
    }
}

impl Default for LapDetectionConfig {
    fn default() -> Self {
        Self {
            radius_m: 50.0,
            min_cluster_size: 10,
            min_lap_seconds: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.vehicle.mass_kg(), 593.0);
        assert_eq!(config.thresholds.braking_g, -0.15);
        assert_eq!(config.laps.min_cluster_size, 10);
        assert_eq!(config.laps.radius_km(), 0.05);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            PipelineConfig::from_json_str(r#"{"vehicle": {"driver_mass_kg": 70}}"#).unwrap();
        assert_eq!(config.vehicle.driver_mass_kg, 70.0);
        assert_eq!(config.vehicle.car_mass_kg, 513.0);
        assert_eq!(config.laps, LapDetectionConfig::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = PipelineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"laps": {{"min_lap_seconds": 30}}}}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.laps.min_lap_seconds, 30.0);

        let missing = PipelineConfig::from_json_file("/nonexistent/rta.json").unwrap_err();
        assert!(matches!(missing, Error::Config(_)));
    }
}
