//! Synthetic data logger output for demos and tests
//!
//! Simulates laps around a circular circuit with straights, braking zones,
//! corners and acceleration phases. The start/finish line sits in a slow
//! timing zone, the one place where GPS fixes from every lap bunch up.
//!
//! The log opens halfway around the lap (an out-lap from the pits) and ends
//! half a lap after the last line crossing.

use anyhow::Result;
use rta_core::channels;
use rta_core::geo::EARTH_RADIUS_KM;
use rta_core::units::STANDARD_GRAVITY;
use rta_core::{ChannelTable, GeoPoint, Unit};
use std::f64::consts::PI;

// =============================================================================
// Track definition
// =============================================================================

#[derive(Clone, Copy)]
enum SegmentKind {
    Straight,
    Braking,
    Corner,
    Accel,
}

#[derive(Clone, Copy)]
struct TrackSegment {
    kind: SegmentKind,
    duration: f64,     // seconds
    target_speed: f64, // m/s at end of segment
    lateral_g: f64,    // peak, signed: + = right
}

impl TrackSegment {
    const fn new(kind: SegmentKind, duration: f64, target_speed: f64, lateral_g: f64) -> Self {
        Self {
            kind,
            duration,
            target_speed,
            lateral_g,
        }
    }
}

/// A fast circuit, about 57 s a lap. The lap starts on the line.
fn demo_track() -> Vec<TrackSegment> {
    use SegmentKind::*;
    vec![
        // Timing zone exit
        TrackSegment::new(Straight, 3.5, 15.0, 0.0),
        TrackSegment::new(Accel, 5.0, 55.0, 0.0),
        // Main straight
        TrackSegment::new(Straight, 9.0, 62.0, 0.0),
        // T1: fast right-hander
        TrackSegment::new(Braking, 2.0, 45.0, 0.1),
        TrackSegment::new(Corner, 4.0, 42.0, 1.6),
        TrackSegment::new(Accel, 3.0, 58.0, 0.4),
        // Back straight
        TrackSegment::new(Straight, 8.0, 66.0, 0.0),
        // T2: sweeping left
        TrackSegment::new(Braking, 2.5, 44.0, -0.1),
        TrackSegment::new(Corner, 3.5, 41.0, -1.5),
        TrackSegment::new(Accel, 3.0, 60.0, -0.3),
        TrackSegment::new(Straight, 7.0, 64.0, 0.0),
        // Into the timing zone
        TrackSegment::new(Braking, 3.0, 15.0, 0.0),
        TrackSegment::new(Straight, 3.5, 15.0, 0.0),
    ]
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Integral of smoothstep over [0, t]
fn smoothstep_integral(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t.powi(3) - t.powi(4) / 2.0
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Vehicle state at one point in the lap
struct LapState {
    speed: f64,       // m/s
    distance: f64,    // m from the line
    longitudinal_g: f64,
    lateral_g: f64,
}

fn compute_lap_state(track: &[TrackSegment], lap_time: f64) -> LapState {
    let lap_duration: f64 = track.iter().map(|s| s.duration).sum();
    let t = lap_time.rem_euclid(lap_duration);

    let mut elapsed = 0.0;
    let mut distance = 0.0;
    let mut prev_speed = track.last().map(|s| s.target_speed).unwrap_or(0.0);
    for seg in track {
        if elapsed + seg.duration > t {
            let u = (t - elapsed) / seg.duration;
            let dv = seg.target_speed - prev_speed;

            let speed = lerp(prev_speed, seg.target_speed, smoothstep(u));
            let covered = seg.duration * (prev_speed * u + dv * smoothstep_integral(u));
            let accel = dv / seg.duration * 6.0 * u * (1.0 - u);

            // Ramp in during the first half, out during the second
            let envelope = match seg.kind {
                SegmentKind::Corner | SegmentKind::Accel | SegmentKind::Braking => {
                    if u < 0.5 {
                        smoothstep(u * 2.0)
                    } else {
                        smoothstep((1.0 - u) * 2.0)
                    }
                }
                SegmentKind::Straight => 0.0,
            };

            return LapState {
                speed,
                distance: distance + covered,
                longitudinal_g: accel / STANDARD_GRAVITY,
                lateral_g: seg.lateral_g * envelope,
            };
        }
        elapsed += seg.duration;
        distance += seg.duration * (prev_speed + seg.target_speed) / 2.0;
        prev_speed = seg.target_speed;
    }

    LapState {
        speed: prev_speed,
        distance,
        longitudinal_g: 0.0,
        lateral_g: 0.0,
    }
}

fn lap_distance(track: &[TrackSegment]) -> f64 {
    let mut prev_speed = track.last().map(|s| s.target_speed).unwrap_or(0.0);
    let mut total = 0.0;
    for seg in track {
        total += seg.duration * (prev_speed + seg.target_speed) / 2.0;
        prev_speed = seg.target_speed;
    }
    total
}

// =============================================================================
// Log generator
// =============================================================================

/// Builder for a synthetic circuit log
#[derive(Debug, Clone)]
pub struct DemoLog {
    laps: u32,
    rate_hz: f64,
    center: GeoPoint,
}

impl Default for DemoLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoLog {
    /// Three timed laps at 1 Hz
    pub fn new() -> Self {
        Self {
            laps: 3,
            rate_hz: 1.0,
            center: GeoPoint::new(52.0704, -1.0147),
        }
    }

    /// Number of start/finish line crossings
    pub fn with_laps(mut self, laps: u32) -> Self {
        self.laps = laps;
        self
    }

    pub fn with_rate(mut self, rate_hz: f64) -> Self {
        self.rate_hz = rate_hz;
        self
    }

    /// Center of the circuit
    pub fn with_center(mut self, center: GeoPoint) -> Self {
        self.center = center;
        self
    }

    pub fn lap_duration(&self) -> f64 {
        demo_track().iter().map(|s| s.duration).sum()
    }

    /// Point on the track `distance` meters past the line
    fn position(&self, distance: f64, circumference: f64) -> GeoPoint {
        let radius = circumference / (2.0 * PI);
        let angle = 2.0 * PI * distance / circumference;
        let meters_per_degree = EARTH_RADIUS_KM * 1000.0 * PI / 180.0;

        GeoPoint::new(
            self.center.lat + radius * angle.sin() / meters_per_degree,
            self.center.lon
                + radius * angle.cos() / (meters_per_degree * self.center.lat.to_radians().cos()),
        )
    }

    /// Generate the log: Time, GPS Speed, GPS LonAcc, GPS LatAcc,
    /// GPS Latitude and GPS Longitude
    pub fn generate(&self) -> Result<ChannelTable> {
        anyhow::ensure!(
            self.rate_hz.is_finite() && self.rate_hz > 0.0,
            "Sample rate must be positive, got {}",
            self.rate_hz
        );

        let track = demo_track();
        let lap_duration = self.lap_duration();
        let circumference = lap_distance(&track);
        let start = lap_duration / 2.0;
        let total = f64::from(self.laps) * lap_duration;
        let samples = (total * self.rate_hz).floor() as usize + 1;

        let mut time = Vec::with_capacity(samples);
        let mut speed = Vec::with_capacity(samples);
        let mut lon_acc = Vec::with_capacity(samples);
        let mut lat_acc = Vec::with_capacity(samples);
        let mut latitude = Vec::with_capacity(samples);
        let mut longitude = Vec::with_capacity(samples);

        for i in 0..samples {
            let t = i as f64 / self.rate_hz;
            let state = compute_lap_state(&track, start + t);
            let position = self.position(state.distance, circumference);

            time.push(t);
            speed.push(state.speed * 3.6);
            lon_acc.push(state.longitudinal_g);
            lat_acc.push(state.lateral_g);
            latitude.push(position.lat);
            longitude.push(position.lon);
        }

        let mut table = ChannelTable::new();
        table.add_column(channels::TIME, Unit::seconds(), time)?;
        table.add_column(channels::GPS_SPEED, Unit::parse("km/h")?, speed)?;
        table.add_column(channels::GPS_LON_ACC, Unit::gravity(), lon_acc)?;
        table.add_column(channels::GPS_LAT_ACC, Unit::gravity(), lat_acc)?;
        table.add_column(channels::GPS_LATITUDE, Unit::degrees(), latitude)?;
        table.add_column(channels::GPS_LONGITUDE, Unit::degrees(), longitude)?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lap_state_continuous_at_lap_wrap() {
        let track = demo_track();
        let duration: f64 = track.iter().map(|s| s.duration).sum();
        let before = compute_lap_state(&track, duration - 1e-6);
        let after = compute_lap_state(&track, duration + 1e-6);
        assert!((before.speed - after.speed).abs() < 1e-3);
        assert!(after.distance < 1.0);
        assert!((before.distance - lap_distance(&track)).abs() < 1e-2);
    }

    #[test]
    fn test_distance_increases_through_lap() {
        let track = demo_track();
        let mut last = -1.0;
        for i in 0..570 {
            let state = compute_lap_state(&track, i as f64 * 0.1);
            assert!(state.distance > last);
            last = state.distance;
        }
    }

    #[test]
    fn test_line_is_at_zero_distance() {
        let log = DemoLog::new();
        let track = demo_track();
        let p = log.position(0.0, lap_distance(&track));
        assert!(p.lon > log.center.lon);
        assert!((p.lat - log.center.lat).abs() < 1e-12);
    }

    #[test]
    fn test_generate_columns() {
        let table = DemoLog::new().with_laps(2).generate().unwrap();
        assert_eq!(table.row_count(), 115);
        assert_eq!(table.num_columns(), 6);
        assert_eq!(table.unit(channels::GPS_SPEED).unwrap().symbol(), "km/h");

        let time = table.values(channels::TIME).unwrap();
        assert_eq!(time[0], 0.0);
        assert_eq!(time[1], 1.0);
    }

    #[test]
    fn test_rejects_bad_rate() {
        assert!(DemoLog::new().with_rate(0.0).generate().is_err());
    }
}
