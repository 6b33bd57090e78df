//! Lap-times lookup service
//!
//! Manually timed laps for each recorded dataset, loaded from a JSON
//! document of the form:
//!
//! ```json
//! {
//!   "session1.csv": {
//!     "lap_times": ["01:02.500", "00:58.120"],
//!     "first_lap": 2,
//!     "last_lap": 9,
//!     "skip_laps": [5]
//!   }
//! }
//! ```
//!
//! The lookup is owned by whoever loads it and passed to the code that
//! needs it. Datasets are keyed by file base name, so full paths can be used
//! for lookups.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Lap bookkeeping for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetLaps {
    /// Lap durations as `MM:SS.sss`
    pub lap_times: Vec<String>,
    pub first_lap: u32,
    pub last_lap: u32,
    #[serde(default)]
    pub skip_laps: Vec<u32>,
}

impl DatasetLaps {
    /// `first_lap..=last_lap` without the skipped laps
    pub fn usable_laps(&self) -> Vec<u32> {
        let skip: BTreeSet<u32> = self.skip_laps.iter().copied().collect();
        (self.first_lap..=self.last_lap)
            .filter(|lap| !skip.contains(lap))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LapTimesLookup {
    datasets: BTreeMap<String, DatasetLaps>,
}

impl LapTimesLookup {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, DatasetLaps> =
            serde_json::from_str(json).context("Invalid lap times JSON")?;

        let mut datasets = BTreeMap::new();
        for (name, laps) in raw {
            for time in &laps.lap_times {
                parse_lap_time(time).with_context(|| format!("Dataset {:?}", name))?;
            }
            datasets.insert(base_name(&name), laps);
        }
        Ok(Self { datasets })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lap times file: {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("In {}", path.display()))
    }

    pub fn datasets(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn get(&self, dataset: &str) -> Option<&DatasetLaps> {
        self.datasets.get(&base_name(dataset))
    }

    fn require(&self, dataset: &str) -> Result<&DatasetLaps> {
        match self.get(dataset) {
            Some(laps) => Ok(laps),
            None => bail!("No lap times recorded for dataset {:?}", base_name(dataset)),
        }
    }

    /// Lap durations in seconds
    pub fn lap_times(&self, dataset: &str) -> Result<Vec<f64>> {
        self.require(dataset)?
            .lap_times
            .iter()
            .map(|t| parse_lap_time(t))
            .collect()
    }

    pub fn usable_laps(&self, dataset: &str) -> Result<Vec<u32>> {
        Ok(self.require(dataset)?.usable_laps())
    }

    /// Usable laps of every dataset, keyed by base name
    pub fn all_usable_laps(&self) -> BTreeMap<String, Vec<u32>> {
        self.datasets
            .iter()
            .map(|(name, laps)| (name.clone(), laps.usable_laps()))
            .collect()
    }

    /// False for unknown datasets
    pub fn is_usable(&self, dataset: &str, lap: u32) -> bool {
        self.get(dataset)
            .map(|laps| laps.usable_laps().contains(&lap))
            .unwrap_or(false)
    }
}

/// Parse a `MM:SS.sss` lap time into seconds
pub fn parse_lap_time(text: &str) -> Result<f64> {
    let text = text.trim();
    let (minutes, seconds) = text
        .split_once(':')
        .with_context(|| format!("Lap time {:?} is not MM:SS.sss", text))?;

    let minutes: u32 = minutes
        .parse()
        .with_context(|| format!("Invalid minutes in lap time {:?}", text))?;
    let seconds: f64 = seconds
        .parse()
        .with_context(|| format!("Invalid seconds in lap time {:?}", text))?;
    if !(0.0..60.0).contains(&seconds) {
        bail!("Seconds out of range in lap time {:?}", text);
    }

    Ok(f64::from(minutes) * 60.0 + seconds)
}

fn base_name(dataset: &str) -> String {
    Path::new(dataset)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dataset.to_string())
}
