//! RaceTelemetryAnalysis command line
//!
//! Batch analysis of data logger exports, plus a synthetic log generator.

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use rta_adapters::{export_table, DemoLog, LapTimesLookup};
use rta_cli::batch::run_batch;
use rta_cli::context::{load_config, BatchContext};
use rta_cli::output::OutputOptions;
use rta_core::ColumnSelection;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Race telemetry log analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive channels and detect laps for one or more logs
    Analyze {
        /// Data logger CSV exports
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        logs: Vec<PathBuf>,

        /// Pipeline config JSON (defaults to the user config file if present)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,

        /// Manually timed laps JSON
        #[arg(long, value_hint = ValueHint::FilePath)]
        lap_times: Option<PathBuf>,

        /// Label laps from the lap-times file instead of GPS detection
        #[arg(long, action = ArgAction::SetTrue, requires = "lap_times")]
        label_laps: bool,

        #[arg(long, default_value = "processed", value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,

        /// Comma-separated channels to export (all when omitted)
        #[arg(long)]
        columns: Option<String>,
    },

    /// Write a synthetic circuit log
    Demo {
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: PathBuf,

        /// Start/finish line crossings
        #[arg(long, default_value_t = 3)]
        laps: u32,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 1.0)]
        rate: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze {
            logs,
            config,
            lap_times,
            label_laps,
            out_dir,
            columns,
        } => {
            let config = load_config(config.as_deref())?;
            let selection = columns
                .as_deref()
                .map(ColumnSelection::parse)
                .unwrap_or_else(ColumnSelection::all);

            let mut ctx = BatchContext::new(config, OutputOptions::new(out_dir, selection))
                .with_lap_labels_from_lookup(label_laps);
            if let Some(path) = lap_times {
                ctx = ctx.with_lap_times(LapTimesLookup::from_path(&path)?);
            }

            let summary = run_batch(ctx, logs).await;
            for outcome in &summary.succeeded {
                info!(
                    "{} -> {}, {}",
                    outcome.source.display(),
                    outcome.files.table.display(),
                    outcome.files.report.display()
                );
            }
            for failure in &summary.failed {
                error!("{}", failure);
            }

            if !summary.all_succeeded() {
                bail!("{} of {} logs failed", summary.failed.len(), summary.total());
            }
            info!("All {} logs processed", summary.total());
        }

        Command::Demo { output, laps, rate } => {
            let table = DemoLog::new().with_laps(laps).with_rate(rate).generate()?;
            export_table(&table, &output, &ColumnSelection::all())?;
            info!(
                "Wrote {} rows of demo telemetry to {}",
                table.row_count(),
                output.display()
            );
        }
    }

    Ok(())
}
