//! Shared batch state
//!
//! Everything a log task needs, shared read-only between tasks.

use crate::output::OutputOptions;
use anyhow::{Context, Result};
use rta_adapters::LapTimesLookup;
use rta_core::PipelineConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// State handed to every log task
#[derive(Clone)]
pub struct BatchContext {
    /// Pipeline parameters
    pub config: Arc<PipelineConfig>,

    /// Manually timed laps, when a lap-times file was given
    pub lap_times: Option<Arc<LapTimesLookup>>,

    /// Where and what to write
    pub output: Arc<OutputOptions>,

    /// Label laps from the lookup instead of detecting them
    pub label_from_lap_times: bool,
}

impl BatchContext {
    pub fn new(config: PipelineConfig, output: OutputOptions) -> Self {
        Self {
            config: Arc::new(config),
            lap_times: None,
            output: Arc::new(output),
            label_from_lap_times: false,
        }
    }

    pub fn with_lap_times(mut self, lookup: LapTimesLookup) -> Self {
        self.lap_times = Some(Arc::new(lookup));
        self
    }

    pub fn with_lap_labels_from_lookup(mut self, enabled: bool) -> Self {
        self.label_from_lap_times = enabled;
        self
    }
}

/// `<config dir>/rta/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rta").join("config.json"))
}

/// Resolve the pipeline config: the explicit file, else the user config
/// file if present, else defaults
pub fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => read_config(&path),
        _ => {
            info!("No config file found, using defaults");
            Ok(PipelineConfig::default())
        }
    }
}

fn read_config(path: &Path) -> Result<PipelineConfig> {
    let config = PipelineConfig::from_json_file(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}
