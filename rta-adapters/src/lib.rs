//! Collaborators around the RaceTelemetryAnalysis core: log loading, table
//! export, lap-times lookup and synthetic demo logs

pub mod csv_log;
pub mod demo;
pub mod export;
pub mod lap_times;

pub use csv_log::{load_table, read_table};
pub use demo::DemoLog;
pub use export::{export_table, write_table};
pub use lap_times::{parse_lap_time, LapTimesLookup};
