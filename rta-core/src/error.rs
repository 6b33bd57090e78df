//! Error taxonomy for the analysis core
//!
//! Every failure is fatal to the operation that raised it. Numeric edge cases
//! (zero time deltas, masked rows) are not errors; they surface as NaN or
//! `None` values in the produced columns.

use crate::units::UnitError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Dimension mismatch on conversion, arithmetic or comparison
    #[error(transparent)]
    IncompatibleUnits(#[from] UnitError),

    #[error("column \"{0}\" already exists")]
    DuplicateColumn(String),

    #[error("column \"{name}\" has {actual} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("column \"{0}\" not found")]
    ColumnNotFound(String),

    #[error("cannot derive \"{channel}\": missing dependency \"{missing}\"")]
    MissingDependency { channel: String, missing: String },

    #[error("table already contains a \"Lap Number\" column")]
    DuplicateLapColumn,

    #[error("state column \"{name}\" holds {value} at row {row}, expected 0 or 1")]
    InvalidStateColumn { name: String, row: usize, value: f64 },

    #[error("Lap Number holds {value} at row {row}, expected a whole lap number")]
    InvalidLapLabel { row: usize, value: f64 },

    #[error("no start/finish cluster with at least {min_cluster_size} points among {points} GPS fixes")]
    NoStartLineFound {
        points: usize,
        min_cluster_size: usize,
    },

    #[error("invalid lap times: {0}")]
    InvalidLapTimes(String),

    #[error("column \"{column}\" has {available} distinct values, {requested} requested")]
    NotEnoughValues {
        column: String,
        requested: usize,
        available: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}
