//! Whole-log analysis driver

use crate::channels;
use crate::config::PipelineConfig;
use crate::derive::DerivationEngine;
use crate::error::Result;
use crate::laps::{detect_laps, LapDetection};
use crate::table::ChannelTable;
use tracing::info;

/// A fully processed log
#[derive(Debug, Clone)]
pub struct AnalyzedLog {
    pub table: ChannelTable,
    /// None when the log came with its own Lap Number column
    pub laps: Option<LapDetection>,
}

/// Run the standard derivation chain, then lap detection
///
/// Logs that already carry lap labels keep them and skip detection.
pub fn analyze(mut table: ChannelTable, config: &PipelineConfig) -> Result<AnalyzedLog> {
    DerivationEngine::standard(config).run(&mut table)?;

    let laps = if table.contains(channels::LAP_NUMBER) {
        info!("Log already has lap labels, skipping lap detection");
        None
    } else {
        Some(detect_laps(&mut table, &config.laps)?)
    };

    Ok(AnalyzedLog { table, laps })
}
