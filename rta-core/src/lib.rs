//! RaceTelemetryAnalysis Core Library
//!
//! This crate provides the unit-aware channel table, the derived channel
//! engine and the GPS lap detector used to analyze data logger exports.

pub mod channels;
pub mod config;
pub mod derive;
pub mod error;
pub mod geo;
pub mod laps;
pub mod pipeline;
pub mod stats;
pub mod table;
pub mod units;

pub use config::PipelineConfig;
pub use derive::{DerivationEngine, DerivedChannel};
pub use error::{Error, Result};
pub use geo::GeoPoint;
pub use laps::{LapBoundary, LapDetection};
pub use pipeline::{analyze, AnalyzedLog};
pub use table::{ChannelTable, Column, ColumnSelection, MaskFill, MaskMode, MaskedColumn};
pub use units::{Quantity, Unit, UnitError};
