//! Channel table CSV writer
//!
//! Writes the same two-level header layout the loader reads, so exported
//! tables load back unchanged. Undefined values become empty cells.

use anyhow::{Context, Result};
use rta_core::{ChannelTable, ColumnSelection};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write the selected columns of `table` as CSV
pub fn write_table<W: Write>(
    table: &ChannelTable,
    writer: W,
    selection: &ColumnSelection,
) -> Result<()> {
    let selected = table.select(selection);
    let mut writer = csv::Writer::from_writer(writer);

    writer.write_record(selected.column_names())?;
    writer.write_record(selected.columns().iter().map(|c| c.unit().symbol()))?;
    for row in 0..selected.row_count() {
        writer.write_record(
            selected
                .columns()
                .iter()
                .map(|c| format_cell(c.values()[row])),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the selected columns of `table` to a CSV file, creating parent
/// directories as needed
pub fn export_table(table: &ChannelTable, path: &Path, selection: &ColumnSelection) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_table(table, file, selection)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_log::{load_table, read_table};
    use rta_core::Unit;

    fn make_test_table() -> ChannelTable {
        let mut table = ChannelTable::new();
        table
            .add_column("Time", Unit::seconds(), vec![0.0, 0.5, 1.0])
            .unwrap();
        table
            .add_column("Acceleration", Unit::parse("m/s^2").unwrap(), vec![f64::NAN, 2.5, -1.0])
            .unwrap();
        table
            .add_column("GPS BRK On", Unit::dimensionless(), vec![0.0, 0.0, 1.0])
            .unwrap();
        table
    }

    #[test]
    fn test_write_two_level_header() {
        let mut out = Vec::new();
        write_table(&make_test_table(), &mut out, &ColumnSelection::all()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Time,Acceleration,GPS BRK On");
        assert_eq!(lines[1], "s,m/s^2,dimensionless");
        assert_eq!(lines[2], "0,,0");
        assert_eq!(lines[3], "0.5,2.5,0");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_written_table_reads_back() {
        let table = make_test_table();
        let mut out = Vec::new();
        write_table(&table, &mut out, &ColumnSelection::all()).unwrap();

        let back = read_table(out.as_slice()).unwrap();
        assert_eq!(back.row_count(), 3);
        for (a, b) in table.columns().iter().zip(back.columns()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.unit().dimension(), b.unit().dimension());
        }
        assert!(back.values("Acceleration").unwrap()[0].is_nan());
    }

    #[test]
    fn test_export_selected_columns_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        export_table(
            &make_test_table(),
            &path,
            &ColumnSelection::parse("time, gps brk on"),
        )
        .unwrap();

        let back = load_table(&path).unwrap();
        let names: Vec<&str> = back.column_names().collect();
        assert_eq!(names, vec!["Time", "GPS BRK On"]);
    }
}
