//! Well-known channel names
//!
//! Input channels come from the logger; the rest are produced by the
//! derivation engine and the lap detector.

// === Logger inputs ===

pub const TIME: &str = "Time";
pub const GPS_SPEED: &str = "GPS Speed";
pub const GPS_LON_ACC: &str = "GPS LonAcc";
pub const GPS_LAT_ACC: &str = "GPS LatAcc";
pub const GPS_LATITUDE: &str = "GPS Latitude";
pub const GPS_LONGITUDE: &str = "GPS Longitude";

// === Derived ===

pub const DELTA_TIME: &str = "Delta Time";
pub const DISTANCE: &str = "Distance on GPS Speed";
pub const G_SUM: &str = "GPS G Sum";
pub const BRAKING: &str = "GPS BRK On";
pub const THROTTLE: &str = "GPS TPS On";
pub const CORNERING: &str = "GPS CRN On";
pub const COASTING: &str = "GPS CST On";
pub const ACCELERATION: &str = "Acceleration";
pub const KINETIC_ENERGY: &str = "Vehicle Kinetic Energy";
pub const DELTA_KE: &str = "Delta KE";
pub const POWER_DKE: &str = "Power - dKE";
pub const POWER_MAV: &str = "Power - mav";

// === Laps ===

pub const LAP_NUMBER: &str = "Lap Number";
pub const LAP_TIME: &str = "Current Lap Time";

/// Suffix used by per-lap normalization
pub const NORMALIZED_SUFFIX: &str = " - Normalized";
