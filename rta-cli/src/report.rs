//! Per-log summary report

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rta_adapters::LapTimesLookup;
use rta_core::laps::lap_indices;
use rta_core::{channels, AnalyzedLog, GeoPoint, Unit};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Summary of one processed log, written next to the processed table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogReport {
    /// File name of the source log
    pub source: String,
    pub processed_at: DateTime<Utc>,
    pub rows: usize,
    /// Seconds between the first and last sample
    pub duration_secs: f64,
    /// None when the log came with its own lap labels
    pub start_finish: Option<GeoPoint>,
    pub laps: Vec<LapSummary>,
    pub channels: Vec<ChannelInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapSummary {
    pub lap: u32,
    pub first_row: usize,
    pub last_row: usize,
    /// Seconds from the first row of this lap to the first row of the next,
    /// or to the end of the log for the final lap
    pub lap_time_secs: f64,
    /// False for the final lap, which the log ends in
    pub complete: bool,
    /// From the lap-times lookup, when it knows this log
    pub usable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    pub unit: String,
}

impl LogReport {
    pub fn build(source: &Path, log: &AnalyzedLog, lookup: Option<&LapTimesLookup>) -> Result<Self> {
        let source = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let table = &log.table;
        let time = table
            .values_in(channels::TIME, &Unit::seconds())
            .context("Report needs a Time channel")?;
        let duration_secs = match (time.first(), time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };

        let dataset = lookup.and_then(|l| l.get(&source));
        let indices = lap_indices(table).context("Report needs a Lap Number channel")?;
        let ranges: Vec<(u32, (usize, usize))> = indices.into_iter().collect();

        let laps = ranges
            .iter()
            .enumerate()
            .map(|(i, &(lap, (first_row, last_row)))| {
                let next = ranges.get(i + 1).map(|&(_, (next_first, _))| next_first);
                let end = next.unwrap_or(last_row);
                LapSummary {
                    lap,
                    first_row,
                    last_row,
                    lap_time_secs: time[end] - time[first_row],
                    complete: next.is_some(),
                    usable: dataset.map(|d| d.usable_laps().contains(&lap)),
                }
            })
            .collect();

        let channels = table
            .columns()
            .iter()
            .map(|c| ChannelInfo {
                name: c.name().to_string(),
                unit: c.unit().symbol().to_string(),
            })
            .collect();

        Ok(Self {
            source,
            processed_at: Utc::now(),
            rows: table.row_count(),
            duration_secs,
            start_finish: log.laps.as_ref().map(|d| d.start_finish),
            laps,
            channels,
        })
    }

    /// Laps that run from one line crossing to the next
    pub fn complete_laps(&self) -> impl Iterator<Item = &LapSummary> {
        self.laps.iter().filter(|l| l.complete)
    }
}
