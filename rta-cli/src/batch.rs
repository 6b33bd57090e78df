//! Batch processing of many logs
//!
//! Every log runs on its own blocking task. Logs share nothing mutable, so
//! one failing log never affects the others: its error is logged and
//! collected, and the rest of the batch carries on.

use crate::context::BatchContext;
use crate::output::{output_names, write_outputs, WrittenFiles};
use crate::report::LogReport;
use anyhow::{Context, Result};
use rta_adapters::load_table;
use rta_core::laps::label_laps_from_times;
use rta_core::{analyze, channels};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Why a log produced no output
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{}: {}", .path.display(), .message)]
    Log { path: PathBuf, message: String },

    #[error("Log task failed: {0}")]
    Task(String),
}

/// A successfully processed log
#[derive(Debug, Clone)]
pub struct LogOutcome {
    pub source: PathBuf,
    pub report: LogReport,
    pub files: WrittenFiles,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Sorted by source path
    pub succeeded: Vec<LogOutcome>,
    pub failed: Vec<BatchError>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Process every log, in parallel
pub async fn run_batch(ctx: BatchContext, logs: Vec<PathBuf>) -> BatchSummary {
    info!("Processing {} logs into {}", logs.len(), ctx.output.out_dir.display());

    let names = output_names(&logs);
    let mut tasks = JoinSet::new();
    for (path, name) in logs.into_iter().zip(names) {
        let ctx = ctx.clone();
        tasks.spawn_blocking(move || {
            let result = process_log(&ctx, &path, &name);
            (path, result)
        });
    }

    let mut summary = BatchSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((path, Ok(outcome))) => {
                info!(
                    "Processed {}: {} rows, {} laps",
                    path.display(),
                    outcome.report.rows,
                    outcome.report.laps.len()
                );
                summary.succeeded.push(outcome);
            }
            Ok((path, Err(e))) => {
                error!("Failed to process {}: {:#}", path.display(), e);
                summary.failed.push(BatchError::Log {
                    path,
                    message: format!("{:#}", e),
                });
            }
            Err(e) => {
                error!("Log task failed: {}", e);
                summary.failed.push(BatchError::Task(e.to_string()));
            }
        }
    }

    summary.succeeded.sort_by(|a, b| a.source.cmp(&b.source));
    summary
}

/// Load, analyze and write out one log as `<output_name>.*`
pub fn process_log(ctx: &BatchContext, path: &Path, output_name: &str) -> Result<LogOutcome> {
    let mut table = load_table(path)?;

    if ctx.label_from_lap_times && !table.contains(channels::LAP_NUMBER) {
        let dataset = path.to_string_lossy();
        if let Some(lookup) = ctx.lap_times.as_deref().filter(|l| l.get(&dataset).is_some()) {
            let times = lookup.lap_times(&dataset)?;
            label_laps_from_times(&mut table, &times)
                .context("Failed to label laps from lap times")?;
            info!("Labelled {} from {} known lap times", path.display(), times.len());
        }
    }

    let log = analyze(table, &ctx.config).context("Analysis failed")?;
    let report = LogReport::build(path, &log, ctx.lap_times.as_deref())?;
    let files = write_outputs(&ctx.output, output_name, &log.table, &report)?;

    Ok(LogOutcome {
        source: path.to_path_buf(),
        report,
        files,
    })
}
