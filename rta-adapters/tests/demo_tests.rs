//! Integration tests for the demo log generator

use rta_adapters::{export_table, load_table, DemoLog};
use rta_core::{analyze, channels, ColumnSelection, PipelineConfig};

#[test]
fn test_demo_log_analyzes_cleanly() {
    let table = DemoLog::new().generate().unwrap();
    let log = analyze(table, &PipelineConfig::default()).unwrap();
    let laps = log.laps.expect("lap detection should run");

    // Out-lap plus one lap per line crossing
    assert_eq!(laps.lap_count, 4);
    assert_eq!(laps.boundaries.len(), 3);
    for boundary in &laps.boundaries[1..] {
        assert_eq!(boundary.lap_time, 57.0);
    }
}

#[test]
fn test_demo_log_has_every_flag_state() {
    let table = DemoLog::new().generate().unwrap();
    let log = analyze(table, &PipelineConfig::default()).unwrap();

    for flag in [
        channels::BRAKING,
        channels::THROTTLE,
        channels::CORNERING,
        channels::COASTING,
    ] {
        let values = log.table.values(flag).unwrap();
        assert!(values.iter().any(|v| *v == 1.0), "{} never on", flag);
        assert!(values.iter().any(|v| *v == 0.0), "{} never off", flag);
    }
}

#[test]
fn test_demo_speeds_are_plausible() {
    let table = DemoLog::new().with_rate(10.0).generate().unwrap();
    let speed = table.values(channels::GPS_SPEED).unwrap();
    let max = speed.iter().cloned().fold(f64::MIN, f64::max);
    let min = speed.iter().cloned().fold(f64::MAX, f64::min);
    assert!(max < 250.0, "max speed {}", max);
    assert!(min > 50.0, "min speed {}", min);
}

#[test]
fn test_demo_log_round_trips_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.csv");

    let table = DemoLog::new().with_laps(2).generate().unwrap();
    export_table(&table, &path, &ColumnSelection::all()).unwrap();
    let loaded = load_table(&path).unwrap();

    assert_eq!(loaded.row_count(), table.row_count());
    let names: Vec<&str> = loaded.column_names().collect();
    let expected: Vec<&str> = table.column_names().collect();
    assert_eq!(names, expected);

    let lat = loaded.values(channels::GPS_LATITUDE).unwrap();
    let original = table.values(channels::GPS_LATITUDE).unwrap();
    for (a, b) in lat.iter().zip(original) {
        assert!((a - b).abs() < 1e-12);
    }
}
