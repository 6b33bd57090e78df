//! Output files for processed logs
//!
//! Each log produces `<name>.processed.csv` with the selected channels and
//! `<name>.report.json` with its summary. The name is the log's file stem,
//! with a `-2`, `-3`, ... suffix when another log in the batch already
//! claimed that stem.

use crate::report::LogReport;
use anyhow::{Context, Result};
use rta_adapters::export_table;
use rta_core::{ChannelTable, ColumnSelection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where processed logs go and which channels they keep
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub out_dir: PathBuf,
    pub selection: ColumnSelection,
}

impl OutputOptions {
    pub fn new(out_dir: impl Into<PathBuf>, selection: ColumnSelection) -> Self {
        Self {
            out_dir: out_dir.into(),
            selection,
        }
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.processed.csv", name))
    }

    pub fn report_path(&self, name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.report.json", name))
    }
}

/// Paths written for one log
#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub table: PathBuf,
    pub report: PathBuf,
}

/// One distinct output name per log, in input order
pub fn output_names(logs: &[PathBuf]) -> Vec<String> {
    let mut taken = HashSet::new();
    logs.iter()
        .map(|path| {
            let base = stem(path);
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}-{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Write the processed table and its report under `name`
pub fn write_outputs(
    options: &OutputOptions,
    name: &str,
    table: &ChannelTable,
    report: &LogReport,
) -> Result<WrittenFiles> {
    let table_path = options.table_path(name);
    export_table(table, &table_path, &options.selection)?;

    let report_path = options.report_path(name);
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(&report_path, json)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    Ok(WrittenFiles {
        table: table_path,
        report: report_path,
    })
}

fn stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths() {
        let options = OutputOptions::new("/tmp/out", ColumnSelection::all());
        assert_eq!(
            options.table_path("session1"),
            PathBuf::from("/tmp/out/session1.processed.csv")
        );
        assert_eq!(
            options.report_path("session1"),
            PathBuf::from("/tmp/out/session1.report.json")
        );
    }

    #[test]
    fn test_output_names_are_distinct() {
        let logs: Vec<PathBuf> = [
            "day1/session.csv",
            "day2/session.csv",
            "session-2.csv",
            "other.csv",
            "day3/session.csv",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        assert_eq!(
            output_names(&logs),
            vec!["session", "session-2", "session-2-2", "other", "session-3"]
        );
    }
}
