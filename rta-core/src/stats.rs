//! Column statistics

use crate::channels;
use crate::error::{Error, Result};
use crate::table::ChannelTable;
use crate::units::{Quantity, Unit};

/// Rank order for [`nth_value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Smallest,
    Largest,
}

/// n-th distinct value of a column (1-based), NaN ignored
///
/// With `precedes`, only rows immediately before a row equal to that value
/// are considered.
pub fn nth_value(
    table: &ChannelTable,
    column: &str,
    n: usize,
    rank: Rank,
    precedes: Option<f64>,
) -> Result<Quantity> {
    let col = table.get_column(column)?;
    let values = col.values();

    let mut candidates: Vec<f64> = match precedes {
        None => values.to_vec(),
        Some(target) => values
            .windows(2)
            .filter(|w| w[1] == target)
            .map(|w| w[0])
            .collect(),
    };
    candidates.retain(|v| !v.is_nan());
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();
    if rank == Rank::Largest {
        candidates.reverse();
    }

    match n.checked_sub(1).and_then(|i| candidates.get(i)) {
        Some(v) => Ok(Quantity::new(*v, col.unit().clone())),
        None => Err(Error::NotEnoughValues {
            column: column.to_string(),
            requested: n,
            available: candidates.len(),
        }),
    }
}

pub fn nth_smallest(
    table: &ChannelTable,
    column: &str,
    n: usize,
    precedes: Option<f64>,
) -> Result<Quantity> {
    nth_value(table, column, n, Rank::Smallest, precedes)
}

pub fn nth_largest(
    table: &ChannelTable,
    column: &str,
    n: usize,
    precedes: Option<f64>,
) -> Result<Quantity> {
    nth_value(table, column, n, Rank::Largest, precedes)
}

/// Min-max rescale a column into `[new_min, new_max]`, written to
/// `"<name> - Normalized"`
///
/// The range is taken over `lap` when given, otherwise over the whole
/// column; every row is rescaled either way. The new column keeps the
/// source unit unless `unit` overrides it. An override only relabels the
/// rescaled numbers, so it must be dimensionless (`%`, `1`).
/// Returns the new column's name.
pub fn normalize_column(
    table: &mut ChannelTable,
    name: &str,
    new_min: f64,
    new_max: f64,
    lap: Option<u32>,
    unit: Option<Unit>,
) -> Result<String> {
    let output = format!("{}{}", name, channels::NORMALIZED_SUFFIX);
    if table.contains(&output) {
        return Err(Error::DuplicateColumn(output));
    }
    if let Some(unit) = &unit {
        unit.conversion_to(&Unit::dimensionless())?;
    }

    let column = table.get_column(name)?;
    let reference: Vec<f64> = match lap {
        Some(lap) => {
            let laps = table.values(channels::LAP_NUMBER)?;
            column
                .values()
                .iter()
                .zip(laps)
                .filter(|(_, l)| **l == f64::from(lap))
                .map(|(v, _)| *v)
                .collect()
        }
        None => column.values().to_vec(),
    };

    let (min, max) = reference
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });

    // An empty or constant range leaves nothing to scale against
    let span = max - min;
    let values = column
        .values()
        .iter()
        .map(|v| {
            if span.is_finite() && span != 0.0 {
                (v - min) / span * (new_max - new_min) + new_min
            } else {
                f64::NAN
            }
        })
        .collect();

    let unit = unit.unwrap_or_else(|| column.unit().clone());
    table.add_column(&output, unit, values)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitError;

    fn make_test_table() -> ChannelTable {
        let mut table = ChannelTable::new();
        table
            .add_column(
                "A",
                Unit::parse("km/h").unwrap(),
                vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0],
            )
            .unwrap();
        table
            .add_column(
                channels::LAP_NUMBER,
                Unit::dimensionless(),
                vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0],
            )
            .unwrap();
        table
    }

    #[test]
    fn test_nth_smallest_and_largest() {
        let table = make_test_table();
        let q = nth_smallest(&table, "A", 2, None).unwrap();
        assert_eq!(q.magnitude, 2.0);
        assert_eq!(q.unit.symbol(), "km/h");

        assert_eq!(nth_largest(&table, "A", 1, None).unwrap().magnitude, 9.0);
        assert_eq!(nth_largest(&table, "A", 3, None).unwrap().magnitude, 4.0);
    }

    #[test]
    fn test_nth_value_preceding() {
        let table = make_test_table();
        // Only the 1 at row 1 precedes a 4
        let q = nth_smallest(&table, "A", 1, Some(4.0)).unwrap();
        assert_eq!(q.magnitude, 1.0);

        // Values before a 1: rows 0 and 2
        assert_eq!(nth_largest(&table, "A", 1, Some(1.0)).unwrap().magnitude, 4.0);
    }

    #[test]
    fn test_nth_value_not_enough() {
        let table = make_test_table();
        let err = nth_smallest(&table, "A", 7, None).unwrap_err();
        assert_eq!(
            err,
            Error::NotEnoughValues {
                column: "A".to_string(),
                requested: 7,
                available: 6
            }
        );
        assert!(nth_smallest(&table, "A", 0, None).is_err());
    }

    #[test]
    fn test_normalize_whole_column() {
        let mut table = make_test_table();
        let name = normalize_column(&mut table, "A", 0.0, 1.0, None, None).unwrap();
        assert_eq!(name, "A - Normalized");

        let values = table.values(&name).unwrap();
        assert_eq!(values[1], 0.0);
        assert_eq!(values[5], 1.0);
        assert_eq!(values[0], 0.25);
        assert_eq!(table.unit(&name).unwrap().symbol(), "km/h");

        assert!(matches!(
            normalize_column(&mut table, "A", 0.0, 1.0, None, None),
            Err(Error::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_normalize_over_lap() {
        let mut table = make_test_table();
        let name =
            normalize_column(&mut table, "A", 0.0, 100.0, Some(1), Some(Unit::percent())).unwrap();
        let values = table.values(&name).unwrap();
        // Lap 1 spans 1..4
        assert!((values[0] - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(values[1], 0.0);
        assert_eq!(values[2], 100.0);
        assert!(values[5] > 100.0);
        assert_eq!(table.unit(&name).unwrap(), &Unit::percent());
    }

    #[test]
    fn test_normalize_rejects_dimensioned_unit() {
        let mut table = make_test_table();
        let err = normalize_column(
            &mut table,
            "A",
            0.0,
            1.0,
            None,
            Some(Unit::parse("m").unwrap()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::IncompatibleUnits(UnitError::Incompatible { .. })
        ));
        assert!(!table.contains("A - Normalized"));

        normalize_column(&mut table, "A", 0.0, 1.0, None, Some(Unit::dimensionless())).unwrap();
        assert!(table.unit("A - Normalized").unwrap().is_dimensionless());
    }
}
