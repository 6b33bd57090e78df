//! RaceTelemetryAnalysis batch driver library
//!
//! Exposes the batch components for integration testing.

pub mod batch;
pub mod context;
pub mod output;
pub mod report;
