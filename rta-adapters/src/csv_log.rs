//! Data logger CSV export reader
//!
//! Logs carry a two-level header: the first row holds channel names, the
//! second the unit of each channel. Every following row is one sample.
//! Blank cells and missing trailing cells read as NaN.

use anyhow::{bail, Context, Result};
use rta_core::units::normalize_symbol;
use rta_core::{ChannelTable, Unit};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Load a log file into a channel table
pub fn load_table(path: &Path) -> Result<ChannelTable> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    let table = read_table(BufReader::new(file))
        .with_context(|| format!("Failed to parse log file: {}", path.display()))?;

    debug!(
        path = %path.display(),
        rows = table.row_count(),
        channels = table.num_columns(),
        "Loaded log"
    );
    Ok(table)
}

/// Parse a two-level-header CSV from any reader
pub fn read_table<R: Read>(reader: R) -> Result<ChannelTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = reader.records();

    let names = match records.next() {
        Some(record) => record.context("Failed to read channel name row")?,
        None => bail!("Log is empty: missing channel name row"),
    };
    let unit_row = match records.next() {
        Some(record) => record.context("Failed to read unit row")?,
        None => bail!("Log has no unit row"),
    };

    let units = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let raw = unit_row.get(i).unwrap_or("");
            Unit::parse(&normalize_symbol(raw))
                .with_context(|| format!("Invalid unit {:?} for channel {:?}", raw, name))
        })
        .collect::<Result<Vec<Unit>>>()?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    for (row, record) in records.enumerate() {
        let record = record.with_context(|| format!("Failed to read data row {}", row + 1))?;
        for (i, values) in columns.iter_mut().enumerate() {
            let cell = record.get(i).unwrap_or("");
            values.push(parse_cell(cell).with_context(|| {
                format!(
                    "Invalid number {:?} in channel {:?} at data row {}",
                    cell,
                    &names[i],
                    row + 1
                )
            })?);
        }
    }

    let mut table = ChannelTable::new();
    for ((name, unit), values) in names.iter().zip(units).zip(columns) {
        table
            .add_column(name, unit, values)
            .with_context(|| format!("Failed to add channel {:?}", name))?;
    }
    Ok(table)
}

fn parse_cell(cell: &str) -> Result<f64> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    Ok(cell.parse::<f64>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
Time,GPS Speed,Throttle,Gear,GPS LonAcc
s,km/h,%,,g
0.0,36.0,50,2,0.1
0.1,37.5,,2,0.12
0.2,39.0,80,3
";

    #[test]
    fn test_read_two_level_header() {
        let table = read_table(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.num_columns(), 5);

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["Time", "GPS Speed", "Throttle", "Gear", "GPS LonAcc"]);

        assert_eq!(table.unit("GPS Speed").unwrap().symbol(), "km/h");
        assert_eq!(table.unit("Throttle").unwrap(), &Unit::percent());
        assert!(table.unit("Gear").unwrap().is_dimensionless());
        assert_eq!(table.unit("GPS LonAcc").unwrap().symbol(), "g");
    }

    #[test]
    fn test_blank_and_missing_cells_are_nan() {
        let table = read_table(SAMPLE.as_bytes()).unwrap();
        assert!(table.values("Throttle").unwrap()[1].is_nan());
        assert!(table.values("GPS LonAcc").unwrap()[2].is_nan());
        assert_eq!(table.values("Throttle").unwrap()[2], 80.0);
    }

    #[test]
    fn test_unit_with_spaces_is_normalized() {
        let csv = "Acc\nm / s^2\n1.0\n";
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.unit("Acc").unwrap().symbol(), "m/s^2");
    }

    #[test]
    fn test_invalid_number_reports_location() {
        let csv = "Time,Speed\ns,km/h\n0.0,abc\n";
        let err = read_table(csv.as_bytes()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Speed"), "{}", message);
        assert!(message.contains("row 1"), "{}", message);
    }

    #[test]
    fn test_unknown_unit_fails() {
        let csv = "Time\nfortnights\n0.0\n";
        assert!(read_table(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_unit_row_fails() {
        assert!(read_table("Time,Speed\n".as_bytes()).is_err());
        assert!(read_table("".as_bytes()).is_err());
    }

    #[test]
    fn test_duplicate_channel_fails() {
        let csv = "Time,Time\ns,s\n0,0\n";
        let err = read_table(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("already exists"));
    }

    #[test]
    fn test_load_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let table = load_table(file.path()).unwrap();
        assert_eq!(table.row_count(), 3);

        let missing = load_table(Path::new("/nonexistent/log.csv")).unwrap_err();
        assert!(format!("{}", missing).contains("Failed to open log file"));
    }
}
