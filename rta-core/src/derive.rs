//! Derived channel definitions and the derivation engine
//!
//! Each [`DerivedChannel`] is a pure function of the table that produces one
//! new column together with its unit. The engine applies a fixed list of
//! steps in dependency order and writes each result back exactly once.
//!
//! Division by a zero time delta yields NaN. Rows are never dropped.

use crate::channels;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::table::ChannelTable;
use crate::units::{Dimension, Unit};
use tracing::debug;

/// A channel computed from other channels
pub trait DerivedChannel: Send + Sync {
    /// Name of the column this step produces
    fn name(&self) -> &str;

    /// Columns that must exist before [`compute`](Self::compute) runs
    fn dependencies(&self) -> Vec<&str>;

    /// Produce the column values and their unit. Must not change the row
    /// count.
    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)>;
}

// ============================================================================
// Numeric helpers
// ============================================================================

/// `v[i] - v[i-1]`, with row 0 set to 0
pub fn delta(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(values.windows(2).map(|w| w[1] - w[0]));
    out
}

/// `delta(values)[i] / dt[i]`, NaN wherever `dt[i] == 0`
pub fn time_derivative(values: &[f64], dt: &[f64]) -> Vec<f64> {
    delta(values)
        .into_iter()
        .zip(dt)
        .map(|(d, t)| if *t == 0.0 { f64::NAN } else { d / t })
        .collect()
}

// ============================================================================
// Steps
// ============================================================================

/// Row-to-row difference of a column, in the column's own unit
#[derive(Debug, Clone)]
pub struct Delta {
    input: String,
    output: String,
}

impl Delta {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
        }
    }
}

impl DerivedChannel for Delta {
    fn name(&self) -> &str {
        &self.output
    }

    fn dependencies(&self) -> Vec<&str> {
        vec![self.input.as_str()]
    }

    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)> {
        let column = table.get_column(&self.input)?;
        Ok((delta(column.values()), column.unit().clone()))
    }
}

/// Rate of change of a column over the Delta Time channel
#[derive(Debug, Clone)]
pub struct TimeDerivative {
    input: String,
    output: String,
}

impl TimeDerivative {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
        }
    }
}

impl DerivedChannel for TimeDerivative {
    fn name(&self) -> &str {
        &self.output
    }

    fn dependencies(&self) -> Vec<&str> {
        vec![self.input.as_str(), channels::DELTA_TIME]
    }

    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)> {
        let column = table.get_column(&self.input)?;
        let dt = table.get_column(channels::DELTA_TIME)?;
        let (unit, factor) = column.unit().quotient(dt.unit())?;

        let values = time_derivative(column.values(), dt.values())
            .into_iter()
            .map(|v| v * factor)
            .collect();
        Ok((values, unit))
    }
}

/// Cumulative distance: running sum of `speed[i-1] * dt[i-1]`, in meters
#[derive(Debug, Clone, Default)]
pub struct DistanceOnSpeed;

impl DerivedChannel for DistanceOnSpeed {
    fn name(&self) -> &str {
        channels::DISTANCE
    }

    fn dependencies(&self) -> Vec<&str> {
        vec![channels::GPS_SPEED, channels::DELTA_TIME]
    }

    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)> {
        let speed = table.get_column(channels::GPS_SPEED)?;
        let dt = table.get_column(channels::DELTA_TIME)?;
        let (unit, factor) = speed.unit().product(dt.unit())?;
        let to_meters = unit.conversion_to(&Unit::meters())?;

        let mut total = 0.0;
        let mut values = Vec::with_capacity(speed.len());
        for i in 0..speed.len() {
            let step = if i == 0 {
                0.0
            } else {
                speed.values()[i - 1] * dt.values()[i - 1] * factor
            };
            // An undefined step is reported in place but does not poison
            // the rest of the running sum
            if step.is_nan() {
                values.push(f64::NAN);
            } else {
                total += step;
                values.push(to_meters.apply(total));
            }
        }
        Ok((values, Unit::meters()))
    }
}

/// Combined acceleration magnitude, in units of standard gravity
#[derive(Debug, Clone, Default)]
pub struct GSum;

impl DerivedChannel for GSum {
    fn name(&self) -> &str {
        channels::G_SUM
    }

    fn dependencies(&self) -> Vec<&str> {
        vec![channels::GPS_LON_ACC, channels::GPS_LAT_ACC]
    }

    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)> {
        let g = Unit::gravity();
        let lon = table.values_in(channels::GPS_LON_ACC, &g)?;
        let lat = table.values_in(channels::GPS_LAT_ACC, &g)?;
        let values = lon
            .iter()
            .zip(&lat)
            .map(|(x, y)| (x * x + y * y).sqrt())
            .collect();
        Ok((values, g))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Below,
    Above,
}

/// 0/1 flag from comparing an acceleration channel against a threshold in g
#[derive(Debug, Clone)]
pub struct ThresholdFlag {
    input: String,
    output: String,
    threshold_g: f64,
    comparison: Comparison,
    absolute: bool,
}

impl ThresholdFlag {
    pub fn new(input: &str, output: &str, threshold_g: f64, comparison: Comparison) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            threshold_g,
            comparison,
            absolute: false,
        }
    }

    /// Compare the magnitude instead of the signed value
    pub fn absolute(mut self) -> Self {
        self.absolute = true;
        self
    }

    pub fn braking(threshold_g: f64) -> Self {
        Self::new(channels::GPS_LON_ACC, channels::BRAKING, threshold_g, Comparison::Below)
    }

    pub fn throttle(threshold_g: f64) -> Self {
        Self::new(channels::GPS_LON_ACC, channels::THROTTLE, threshold_g, Comparison::Above)
    }

    pub fn cornering(threshold_g: f64) -> Self {
        Self::new(channels::GPS_LAT_ACC, channels::CORNERING, threshold_g, Comparison::Above)
            .absolute()
    }
}

impl DerivedChannel for ThresholdFlag {
    fn name(&self) -> &str {
        &self.output
    }

    fn dependencies(&self) -> Vec<&str> {
        vec![self.input.as_str()]
    }

    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)> {
        let values = table
            .values_in(&self.input, &Unit::gravity())?
            .into_iter()
            .map(|v| {
                let v = if self.absolute { v.abs() } else { v };
                let on = match self.comparison {
                    Comparison::Below => v < self.threshold_g,
                    Comparison::Above => v > self.threshold_g,
                };
                if on {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        Ok((values, Unit::dimensionless()))
    }
}

/// 1 when braking, throttle and cornering flags are all off
#[derive(Debug, Clone, Default)]
pub struct CoastingFlag;

impl DerivedChannel for CoastingFlag {
    fn name(&self) -> &str {
        channels::COASTING
    }

    fn dependencies(&self) -> Vec<&str> {
        vec![channels::BRAKING, channels::THROTTLE, channels::CORNERING]
    }

    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)> {
        let flags = self
            .dependencies()
            .into_iter()
            .map(|name| table.values(name))
            .collect::<Result<Vec<_>>>()?;

        let values = (0..table.row_count())
            .map(|row| {
                if flags.iter().all(|f| f[row] == 0.0) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        Ok((values, Unit::dimensionless()))
    }
}

/// `0.5 * m * v^2`
#[derive(Debug, Clone)]
pub struct KineticEnergy {
    mass_kg: f64,
}

impl KineticEnergy {
    pub fn new(mass_kg: f64) -> Self {
        Self { mass_kg }
    }
}

impl DerivedChannel for KineticEnergy {
    fn name(&self) -> &str {
        channels::KINETIC_ENERGY
    }

    fn dependencies(&self) -> Vec<&str> {
        vec![channels::GPS_SPEED]
    }

    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)> {
        let speed = table.get_column(channels::GPS_SPEED)?;
        let (speed_sq, f1) = speed.unit().powi(2)?;
        let (unit, f2) = Unit::kilograms().product(&speed_sq)?;
        debug_assert_eq!(unit.dimension(), Dimension::ENERGY);

        let factor = 0.5 * self.mass_kg * f1 * f2;
        let values = speed.values().iter().map(|v| factor * v * v).collect();
        Ok((values, unit))
    }
}

/// Tractive power from longitudinal force: `m * a_lon * v`
#[derive(Debug, Clone)]
pub struct ForcePower {
    mass_kg: f64,
}

impl ForcePower {
    pub fn new(mass_kg: f64) -> Self {
        Self { mass_kg }
    }
}

impl DerivedChannel for ForcePower {
    fn name(&self) -> &str {
        channels::POWER_MAV
    }

    fn dependencies(&self) -> Vec<&str> {
        vec![channels::GPS_LON_ACC, channels::GPS_SPEED]
    }

    fn compute(&self, table: &ChannelTable) -> Result<(Vec<f64>, Unit)> {
        let acc = table.get_column(channels::GPS_LON_ACC)?;
        let speed = table.get_column(channels::GPS_SPEED)?;
        let (force, f1) = Unit::kilograms().product(acc.unit())?;
        let (unit, f2) = force.product(speed.unit())?;

        let factor = self.mass_kg * f1 * f2;
        let values = acc
            .values()
            .iter()
            .zip(speed.values())
            .map(|(a, v)| factor * a * v)
            .collect();
        Ok((values, unit))
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Evaluate one step and append its column
///
/// Fails if the output column already exists or a dependency is missing.
pub fn derive_one(table: &mut ChannelTable, step: &dyn DerivedChannel) -> Result<()> {
    if table.contains(step.name()) {
        return Err(Error::DuplicateColumn(step.name().to_string()));
    }
    if let Some(missing) = step.dependencies().into_iter().find(|d| !table.contains(d)) {
        return Err(Error::MissingDependency {
            channel: step.name().to_string(),
            missing: missing.to_string(),
        });
    }

    let (values, unit) = step.compute(table)?;
    debug!(channel = step.name(), unit = unit.symbol(), "Derived channel");
    table.add_column(step.name(), unit, values)
}

/// Ordered list of derivation steps
#[derive(Default)]
pub struct DerivationEngine {
    steps: Vec<Box<dyn DerivedChannel>>,
}

impl DerivationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed chain: time delta, kinematics, state flags, energy, power
    pub fn standard(config: &PipelineConfig) -> Self {
        let mass = config.vehicle.mass_kg();
        let thresholds = &config.thresholds;

        Self::new()
            .with_step(Delta::new(channels::TIME, channels::DELTA_TIME))
            .with_step(DistanceOnSpeed)
            .with_step(GSum)
            .with_step(ThresholdFlag::braking(thresholds.braking_g))
            .with_step(ThresholdFlag::throttle(thresholds.throttle_g))
            .with_step(ThresholdFlag::cornering(thresholds.cornering_g))
            .with_step(CoastingFlag)
            .with_step(TimeDerivative::new(channels::GPS_SPEED, channels::ACCELERATION))
            .with_step(KineticEnergy::new(mass))
            .with_step(Delta::new(channels::KINETIC_ENERGY, channels::DELTA_KE))
            .with_step(TimeDerivative::new(channels::KINETIC_ENERGY, channels::POWER_DKE))
            .with_step(ForcePower::new(mass))
    }

    pub fn with_step(mut self, step: impl DerivedChannel + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Output names in evaluation order
    pub fn outputs(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Apply every step in order, stopping at the first failure
    pub fn run(&self, table: &mut ChannelTable) -> Result<()> {
        for step in &self.steps {
            derive_one(table, step.as_ref())?;
        }
        debug!(steps = self.steps.len(), "Derivation complete");
        Ok(())
    }
}
