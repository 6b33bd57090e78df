//! Integration tests for the batch driver

use rta_adapters::{export_table, load_table, DemoLog, LapTimesLookup};
use rta_cli::batch::{run_batch, BatchError};
use rta_cli::context::BatchContext;
use rta_cli::output::OutputOptions;
use rta_cli::report::LogReport;
use rta_core::{channels, ColumnSelection, PipelineConfig};
use std::path::{Path, PathBuf};

fn write_demo_log(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let table = DemoLog::new().generate().unwrap();
    export_table(&table, &path, &ColumnSelection::all()).unwrap();
    path
}

fn context(out_dir: &Path) -> BatchContext {
    BatchContext::new(
        PipelineConfig::default(),
        OutputOptions::new(out_dir, ColumnSelection::all()),
    )
}

#[tokio::test]
async fn test_batch_isolates_failing_logs() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");

    let good = write_demo_log(dir.path(), "good.csv");
    let no_gps = dir.path().join("no_gps.csv");
    std::fs::write(&no_gps, "Time,Throttle\ns,%\n0,10\n1,20\n").unwrap();
    let missing = dir.path().join("missing.csv");

    let summary = run_batch(context(&out_dir), vec![no_gps, good.clone(), missing]).await;

    assert_eq!(summary.total(), 3);
    assert!(!summary.all_succeeded());
    assert_eq!(summary.succeeded.len(), 1);
    assert_eq!(summary.failed.len(), 2);
    assert_eq!(summary.succeeded[0].source, good);

    let failed: Vec<String> = summary
        .failed
        .iter()
        .map(|e| match e {
            BatchError::Log { path, .. } => path.file_name().unwrap().to_string_lossy().into_owned(),
            BatchError::Task(message) => panic!("unexpected task failure: {}", message),
        })
        .collect();
    assert!(failed.contains(&"no_gps.csv".to_string()));
    assert!(failed.contains(&"missing.csv".to_string()));

    assert!(out_dir.join("good.processed.csv").is_file());
    assert!(out_dir.join("good.report.json").is_file());
    assert!(!out_dir.join("no_gps.processed.csv").exists());
}

#[tokio::test]
async fn test_batch_writes_processed_table_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let log = write_demo_log(dir.path(), "session.csv");

    let summary = run_batch(context(&out_dir), vec![log]).await;
    assert!(summary.all_succeeded());

    let table = load_table(&out_dir.join("session.processed.csv")).unwrap();
    for name in [
        channels::DELTA_TIME,
        channels::DISTANCE,
        channels::COASTING,
        channels::POWER_MAV,
        channels::LAP_NUMBER,
        channels::LAP_TIME,
    ] {
        assert!(table.contains(name), "missing {}", name);
    }

    let json = std::fs::read_to_string(out_dir.join("session.report.json")).unwrap();
    let report: LogReport = serde_json::from_str(&json).unwrap();
    assert_eq!(report.source, "session.csv");
    assert_eq!(report.rows, table.row_count());
    assert!(report.start_finish.is_some());

    let laps: Vec<u32> = report.laps.iter().map(|l| l.lap).collect();
    assert_eq!(laps, vec![1, 2, 3, 4]);
    for lap in &report.laps[1..3] {
        assert!(lap.complete);
        assert_eq!(lap.lap_time_secs, 57.0);
    }
    assert!(!report.laps[3].complete);
}

#[tokio::test]
async fn test_batch_exports_selected_columns() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let log = write_demo_log(dir.path(), "session.csv");

    let ctx = BatchContext::new(
        PipelineConfig::default(),
        OutputOptions::new(&out_dir, ColumnSelection::parse("time, lap number")),
    );
    let summary = run_batch(ctx, vec![log]).await;
    assert!(summary.all_succeeded());

    let table = load_table(&out_dir.join("session.processed.csv")).unwrap();
    let names: Vec<&str> = table.column_names().collect();
    assert_eq!(names, vec![channels::TIME, channels::LAP_NUMBER]);
}

#[tokio::test]
async fn test_batch_labels_laps_from_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let log = write_demo_log(dir.path(), "timed.csv");

    let lookup = LapTimesLookup::from_json_str(
        r#"{"timed.csv": {
            "lap_times": ["00:28.500", "00:57.000", "00:57.000", "00:57.000"],
            "first_lap": 2,
            "last_lap": 3
        }}"#,
    )
    .unwrap();
    let ctx = context(&out_dir)
        .with_lap_times(lookup)
        .with_lap_labels_from_lookup(true);

    let summary = run_batch(ctx, vec![log]).await;
    assert!(summary.all_succeeded());

    let report = &summary.succeeded[0].report;
    assert!(report.start_finish.is_none());
    let laps: Vec<(u32, Option<bool>)> = report.laps.iter().map(|l| (l.lap, l.usable)).collect();
    assert_eq!(laps, vec![(1, Some(false)), (2, Some(true)), (3, Some(true))]);
    assert_eq!(report.laps[1].lap_time_secs, 57.0);
}

#[tokio::test]
async fn test_same_stem_logs_keep_separate_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(dir.path().join("day1")).unwrap();
    std::fs::create_dir_all(dir.path().join("day2")).unwrap();

    let first = write_demo_log(&dir.path().join("day1"), "session.csv");
    let second_path = dir.path().join("day2").join("session.csv");
    let second = DemoLog::new().with_rate(2.0).generate().unwrap();
    export_table(&second, &second_path, &ColumnSelection::all()).unwrap();

    let summary = run_batch(context(&out_dir), vec![first.clone(), second_path.clone()]).await;
    assert!(summary.all_succeeded());
    assert_eq!(summary.succeeded.len(), 2);

    let mut tables: Vec<PathBuf> = summary.succeeded.iter().map(|o| o.files.table.clone()).collect();
    tables.sort();
    assert_eq!(
        tables,
        vec![
            out_dir.join("session-2.processed.csv"),
            out_dir.join("session.processed.csv"),
        ]
    );

    // Each output holds its own log
    for outcome in &summary.succeeded {
        let written = load_table(&outcome.files.table).unwrap();
        assert_eq!(written.row_count(), outcome.report.rows);
        let json = std::fs::read_to_string(&outcome.files.report).unwrap();
        let report: LogReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.rows, outcome.report.rows);
    }
    let first_rows = summary.succeeded.iter().find(|o| o.source == first).unwrap().report.rows;
    let second_rows = summary.succeeded.iter().find(|o| o.source == second_path).unwrap().report.rows;
    assert_ne!(first_rows, second_rows);
    assert_eq!(
        load_table(&out_dir.join("session.processed.csv")).unwrap().row_count(),
        first_rows
    );
}
