//! Lap detection and lap bookkeeping
//!
//! Detection runs in two passes over a table that already carries Delta Time
//! and GPS position:
//!
//! 1. The start/finish line is localized as the centroid of the largest
//!    density cluster of GPS fixes. The line is the one place a car passes
//!    every lap, so fixes pile up there.
//! 2. A single-pass state machine walks the rows and starts a new lap each
//!    time the car comes back within the radius of that point, debounced by
//!    a minimum lap duration.
//!
//! Latitude and longitude are read as plain angles; their unit tags are not
//! consulted by the geometric algorithm.

use crate::channels;
use crate::config::LapDetectionConfig;
use crate::error::{Error, Result};
use crate::geo::{density_cluster, great_circle_distance_km, GeoPoint};
use crate::table::ChannelTable;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A row at which the car was judged to have completed a lap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapBoundary {
    /// Row index of the crossing
    pub index: usize,
    /// The lap that ended at this row
    pub completed_lap: u32,
    /// Elapsed time of the completed lap, in seconds
    pub lap_time: f64,
}

/// Result of a full detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapDetection {
    pub start_finish: GeoPoint,
    pub boundaries: Vec<LapBoundary>,
    /// Final value of the Lap Number column
    pub lap_count: u32,
}

// ============================================================================
// Start/finish localization
// ============================================================================

/// Centroid of the largest density cluster among `points`
///
/// Points outside every cluster are ignored. On equal sizes the cluster
/// discovered first wins.
pub fn identify_start_finish(points: &[GeoPoint], config: &LapDetectionConfig) -> Result<GeoPoint> {
    let labels = density_cluster(points, config.radius_km(), config.min_cluster_size);

    let mut sizes: Vec<usize> = Vec::new();
    for label in labels.iter().flatten() {
        if *label >= sizes.len() {
            sizes.resize(label + 1, 0);
        }
        sizes[*label] += 1;
    }

    let largest = sizes
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, usize)>, (label, &size)| match best {
            Some((_, best_size)) if best_size >= size => best,
            _ => Some((label, size)),
        })
        .map(|(label, _)| label);

    let members: Vec<GeoPoint> = match largest {
        Some(largest) => points
            .iter()
            .zip(&labels)
            .filter(|(_, l)| **l == Some(largest))
            .map(|(p, _)| *p)
            .collect(),
        None => Vec::new(),
    };

    let centroid = GeoPoint::centroid(&members).ok_or(Error::NoStartLineFound {
        points: points.len(),
        min_cluster_size: config.min_cluster_size,
    })?;

    debug!(
        clusters = sizes.len(),
        members = members.len(),
        lat = centroid.lat,
        lon = centroid.lon,
        "Start/finish cluster"
    );
    Ok(centroid)
}

// ============================================================================
// Lap counter
// ============================================================================

/// Lap number and elapsed lap time emitted for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapStep {
    pub lap: u32,
    pub elapsed: f64,
    pub boundary: Option<LapBoundary>,
}

/// Single-pass lap counting state machine
///
/// The boundary test for a row uses the elapsed time accumulated through the
/// previous row; the row's own delta is added afterwards. The first lap is
/// exempt from the debounce because logging may start on the line.
#[derive(Debug, Clone)]
pub struct LapCounter {
    start_finish: GeoPoint,
    radius_km: f64,
    min_lap_seconds: f64,
    lap: u32,
    elapsed: f64,
    row: usize,
}

impl LapCounter {
    pub fn new(start_finish: GeoPoint, config: &LapDetectionConfig) -> Self {
        Self {
            start_finish,
            radius_km: config.radius_km(),
            min_lap_seconds: config.min_lap_seconds,
            lap: 1,
            elapsed: 0.0,
            row: 0,
        }
    }

    pub fn lap(&self) -> u32 {
        self.lap
    }

    /// Advance by one row. `dt` is the row's Delta Time in seconds; a
    /// non-finite delta is a sampling gap and adds nothing.
    pub fn step(&mut self, position: GeoPoint, dt: f64) -> LapStep {
        let near_line = great_circle_distance_km(position, self.start_finish) <= self.radius_km;
        let is_new_lap =
            near_line && self.row > 0 && (self.elapsed >= self.min_lap_seconds || self.lap == 1);

        if dt.is_finite() {
            self.elapsed += dt;
        }

        let boundary = if is_new_lap {
            let boundary = LapBoundary {
                index: self.row,
                completed_lap: self.lap,
                lap_time: self.elapsed,
            };
            self.lap += 1;
            self.elapsed = 0.0;
            Some(boundary)
        } else {
            None
        };

        self.row += 1;
        LapStep {
            lap: self.lap,
            elapsed: self.elapsed,
            boundary,
        }
    }
}

// ============================================================================
// Table operations
// ============================================================================

/// GPS fixes of every row, in degrees
pub fn gps_points(table: &ChannelTable) -> Result<Vec<GeoPoint>> {
    let lat = table.values(channels::GPS_LATITUDE)?;
    let lon = table.values(channels::GPS_LONGITUDE)?;
    Ok(lat
        .iter()
        .zip(lon)
        .map(|(lat, lon)| GeoPoint::new(*lat, *lon))
        .collect())
}

/// Lap labelling reads GPS position and the per-row time step
fn require_inputs(table: &ChannelTable) -> Result<()> {
    for input in [
        channels::GPS_LATITUDE,
        channels::GPS_LONGITUDE,
        channels::DELTA_TIME,
    ] {
        if !table.contains(input) {
            return Err(Error::MissingDependency {
                channel: channels::LAP_NUMBER.to_string(),
                missing: input.to_string(),
            });
        }
    }
    Ok(())
}

/// Run the lap counter against a known start/finish point and append the
/// Lap Number and Current Lap Time columns
///
/// The table is left unchanged on error.
pub fn assign_laps(
    table: &mut ChannelTable,
    start_finish: GeoPoint,
    config: &LapDetectionConfig,
) -> Result<Vec<LapBoundary>> {
    if table.contains(channels::LAP_NUMBER) {
        return Err(Error::DuplicateLapColumn);
    }
    if table.contains(channels::LAP_TIME) {
        return Err(Error::DuplicateColumn(channels::LAP_TIME.to_string()));
    }

    require_inputs(table)?;
    let points = gps_points(table)?;
    let dt = table.values_in(channels::DELTA_TIME, &Unit::seconds())?;

    let mut counter = LapCounter::new(start_finish, config);
    let mut laps = Vec::with_capacity(points.len());
    let mut times = Vec::with_capacity(points.len());
    let mut boundaries = Vec::new();
    for (position, dt) in points.into_iter().zip(dt) {
        let step = counter.step(position, dt);
        laps.push(f64::from(step.lap));
        times.push(step.elapsed);
        boundaries.extend(step.boundary);
    }

    table.add_column(channels::LAP_NUMBER, Unit::dimensionless(), laps)?;
    table.add_column(channels::LAP_TIME, Unit::seconds(), times)?;
    Ok(boundaries)
}

/// Localize the start/finish line and label every row with its lap
pub fn detect_laps(table: &mut ChannelTable, config: &LapDetectionConfig) -> Result<LapDetection> {
    if table.contains(channels::LAP_NUMBER) {
        return Err(Error::DuplicateLapColumn);
    }

    require_inputs(table)?;
    let points = gps_points(table)?;
    let start_finish = identify_start_finish(&points, config)?;
    let boundaries = assign_laps(table, start_finish, config)?;
    let lap_count = boundaries.last().map(|b| b.completed_lap + 1).unwrap_or(1);

    info!(
        lat = start_finish.lat,
        lon = start_finish.lon,
        laps = lap_count,
        "Lap detection complete"
    );

    Ok(LapDetection {
        start_finish,
        boundaries,
        lap_count,
    })
}

// ============================================================================
// Bookkeeping
// ============================================================================

/// First and last row of every lap in the Lap Number column
///
/// NaN rows carry no lap and are skipped. Any other label must be a whole
/// number in `u32` range.
pub fn lap_indices(table: &ChannelTable) -> Result<BTreeMap<u32, (usize, usize)>> {
    let laps = table.values(channels::LAP_NUMBER)?;
    let mut out: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for (row, lap) in laps.iter().enumerate() {
        if lap.is_nan() {
            continue;
        }
        if lap.fract() != 0.0 || *lap < 0.0 || *lap > f64::from(u32::MAX) {
            return Err(Error::InvalidLapLabel { row, value: *lap });
        }
        out.entry(*lap as u32)
            .and_modify(|(_, last)| *last = row)
            .or_insert((row, row));
    }
    Ok(out)
}

/// `(2, last_lap - 1)`: the laps between the out-lap and the in-lap
///
/// The range is empty when the log has fewer than three laps.
pub fn interior_laps(table: &ChannelTable) -> Result<(u32, u32)> {
    let last = lap_indices(table)?.keys().next_back().copied().unwrap_or(0);
    Ok((2, last.saturating_sub(1)))
}

/// Evenly spaced times from 0 to `last - first`, same length as `times`
///
/// Used to overlay laps on a common time axis.
pub fn rebase_lap_times(times: &[f64]) -> Vec<f64> {
    match times {
        [] => Vec::new(),
        [_] => vec![0.0],
        [first, .., last] => {
            let span = last - first;
            let steps = (times.len() - 1) as f64;
            (0..times.len()).map(|i| span * i as f64 / steps).collect()
        }
    }
}

/// Label the Lap Number column from known lap durations (seconds)
///
/// With cumulative sums `c`, a row gets the smallest `k >= 1` such that
/// `Time < c[k]`; rows at or past the last cumulative time get
/// `lap_times.len() - 1`.
pub fn label_laps_from_times(table: &mut ChannelTable, lap_times: &[f64]) -> Result<()> {
    if table.contains(channels::LAP_NUMBER) {
        return Err(Error::DuplicateLapColumn);
    }
    if lap_times.is_empty() {
        return Err(Error::InvalidLapTimes("no lap times given".to_string()));
    }
    if let Some(bad) = lap_times.iter().find(|t| !t.is_finite() || **t < 0.0) {
        return Err(Error::InvalidLapTimes(format!("lap time {} is not a duration", bad)));
    }

    let cumulative: Vec<f64> = lap_times
        .iter()
        .scan(0.0, |sum, t| {
            *sum += t;
            Some(*sum)
        })
        .collect();
    let default_lap = (cumulative.len() - 1) as f64;

    let time = table.values_in(channels::TIME, &Unit::seconds())?;
    let laps = time
        .iter()
        .map(|t| {
            cumulative
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, c)| t < c)
                .map(|(k, _)| k as f64)
                .unwrap_or(default_lap)
        })
        .collect();

    table.add_column(channels::LAP_NUMBER, Unit::dimensionless(), laps)
}
