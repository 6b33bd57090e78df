//! Unit-aware channel table
//!
//! A [`ChannelTable`] owns an ordered set of equal-length numeric columns,
//! each tagged with its [`Unit`]. Column data and unit metadata live in the
//! same [`Column`] so the two can never fall out of sync.
//!
//! Row index is the implicit join key across all columns. The table is
//! append-only with respect to columns: an existing column is never removed
//! or overwritten.

use crate::error::{Error, Result};
use crate::units::{Quantity, Unit};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// A named channel: one value per row, all expressed in `unit`
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    unit: Unit,
    values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, unit: Unit, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            unit,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `row` as a quantity
    pub fn quantity(&self, row: usize) -> Option<Quantity> {
        self.values
            .get(row)
            .map(|v| Quantity::new(*v, self.unit.clone()))
    }

    /// Copy of the values re-expressed in a compatible unit
    pub fn values_in(&self, unit: &Unit) -> Result<Vec<f64>> {
        let conversion = self.unit.conversion_to(unit)?;
        if conversion.is_identity() {
            return Ok(self.values.clone());
        }
        Ok(self.values.iter().map(|v| conversion.apply(*v)).collect())
    }
}

// === Masking ===

/// Whether all or any of the condition columns must be on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    All,
    Any,
}

/// What masked-out rows become
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskFill {
    /// Zero in the column's own unit
    Zero,
    /// Explicit "no value"
    Undefined,
}

/// A data column filtered by state columns. Masked-out rows are `None`
/// when filled with [`MaskFill::Undefined`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedColumn {
    name: String,
    unit: Unit,
    values: Vec<Option<f64>>,
}

impl MaskedColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Rows that kept their value
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Append `" <suffix>"` to the column name
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        let suffix = suffix.trim();
        if !suffix.is_empty() {
            self.name = format!("{} {}", self.name, suffix);
        }
        self
    }
}

// === Column selection ===

/// Specifies which columns to include when copying or exporting a table
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ColumnSelection {
    names: HashSet<String>,
    include_all: bool,
}

impl ColumnSelection {
    /// Select every column
    pub fn all() -> Self {
        Self {
            names: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a selection from a comma-separated list of column names
    pub fn parse(names: &str) -> Self {
        let names: HashSet<String> = names
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            names,
            include_all: false,
        }
    }

    pub fn with_column(mut self, name: &str) -> Self {
        self.names.insert(name.trim().to_lowercase());
        self
    }

    pub fn includes(&self, name: &str) -> bool {
        self.include_all || self.names.contains(&name.to_lowercase())
    }

    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for ColumnSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

// === Table ===

/// Ordered collection of named, equal-length, unit-tagged columns
#[derive(Debug, Clone, Default)]
pub struct ChannelTable {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows (0 for a table without columns)
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// True when the table has no columns yet
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Append a column. The first column establishes the row count.
    pub fn add_column(&mut self, name: &str, unit: Unit, values: Vec<f64>) -> Result<()> {
        self.push(Column::new(name, unit, values))
    }

    /// Append a column whose values are expressed in `from`, storing them in
    /// `to`
    pub fn add_column_converted(
        &mut self,
        name: &str,
        values: Vec<f64>,
        from: &Unit,
        to: Unit,
    ) -> Result<()> {
        let conversion = from.conversion_to(&to)?;
        let values = if conversion.is_identity() {
            values
        } else {
            values.into_iter().map(|v| conversion.apply(v)).collect()
        };
        self.add_column(name, to, values)
    }

    /// Append a column of quantities, each converted into `unit`. Fails if
    /// any quantity has a different dimension.
    pub fn add_quantities(&mut self, name: &str, unit: Unit, quantities: &[Quantity]) -> Result<()> {
        let values = quantities
            .iter()
            .map(|q| q.value_in(&unit))
            .collect::<std::result::Result<Vec<f64>, _>>()?;
        self.add_column(name, unit, values)
    }

    pub(crate) fn push(&mut self, column: Column) -> Result<()> {
        if self.contains(column.name()) {
            return Err(Error::DuplicateColumn(column.name().to_string()));
        }
        if !self.is_empty() && column.len() != self.row_count() {
            return Err(Error::LengthMismatch {
                name: column.name().to_string(),
                expected: self.row_count(),
                actual: column.len(),
            });
        }
        self.index.insert(column.name().to_string(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    pub fn get_column(&self, name: &str) -> Result<&Column> {
        self.index
            .get(name)
            .map(|&i| &self.columns[i])
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    pub fn values(&self, name: &str) -> Result<&[f64]> {
        Ok(self.get_column(name)?.values())
    }

    pub fn unit(&self, name: &str) -> Result<&Unit> {
        Ok(self.get_column(name)?.unit())
    }

    /// Values of `name` re-expressed in `unit`
    pub fn values_in(&self, name: &str, unit: &Unit) -> Result<Vec<f64>> {
        self.get_column(name)?.values_in(unit)
    }

    /// Copy of rows `start..=end`
    ///
    /// `start` defaults to 0. `end` defaults to `row_count - 2` and is clamped
    /// to it: the final row of a log is frequently truncated, so it is never
    /// part of a slice.
    pub fn slice_rows(&self, start: Option<usize>, end: Option<usize>) -> ChannelTable {
        let last_exclusive = self.row_count().saturating_sub(1);
        let end_exclusive = end
            .map(|e| e.saturating_add(1))
            .unwrap_or(last_exclusive)
            .min(last_exclusive);
        let start = start.unwrap_or(0).min(end_exclusive);

        let mut out = ChannelTable::new();
        for column in &self.columns {
            out.columns.push(Column::new(
                column.name(),
                column.unit().clone(),
                column.values[start..end_exclusive].to_vec(),
            ));
        }
        out.index = self.index.clone();
        out
    }

    /// Copy of the selected columns, in table order
    pub fn select(&self, selection: &ColumnSelection) -> ChannelTable {
        let mut out = ChannelTable::new();
        for column in self.columns.iter().filter(|c| selection.includes(c.name())) {
            out.index.insert(column.name().to_string(), out.columns.len());
            out.columns.push(column.clone());
        }
        out
    }

    /// Per-row on/off state combined from flag columns
    ///
    /// Every condition column must hold only 0 or 1.
    pub fn state_mask(&self, conditions: &[&str], mode: MaskMode) -> Result<Vec<bool>> {
        let mut flags = Vec::with_capacity(conditions.len());
        for name in conditions {
            let values = self.values(name)?;
            if let Some((row, value)) = values
                .iter()
                .enumerate()
                .find(|(_, v)| **v != 0.0 && **v != 1.0)
            {
                return Err(Error::InvalidStateColumn {
                    name: name.to_string(),
                    row,
                    value: *value,
                });
            }
            flags.push(values);
        }

        Ok((0..self.row_count())
            .map(|row| match mode {
                MaskMode::All => flags.iter().all(|f| f[row] == 1.0),
                MaskMode::Any => flags.iter().any(|f| f[row] == 1.0),
            })
            .collect())
    }

    /// One data column restricted to rows where the state columns are on
    pub fn mask_single_column(
        &self,
        data: &str,
        conditions: &[&str],
        mode: MaskMode,
        fill: MaskFill,
    ) -> Result<MaskedColumn> {
        let column = self.get_column(data)?;
        let mask = self.state_mask(conditions, mode)?;
        Ok(apply_mask(column, &mask, fill))
    }

    /// Several data columns restricted to rows where the state columns are on
    pub fn mask_many_columns(
        &self,
        data: &[&str],
        conditions: &[&str],
        mode: MaskMode,
        fill: MaskFill,
    ) -> Result<Vec<MaskedColumn>> {
        let columns = data
            .iter()
            .map(|name| self.get_column(name))
            .collect::<Result<Vec<_>>>()?;
        let mask = self.state_mask(conditions, mode)?;
        Ok(columns
            .into_iter()
            .map(|c| apply_mask(c, &mask, fill))
            .collect())
    }
}

fn apply_mask(column: &Column, mask: &[bool], fill: MaskFill) -> MaskedColumn {
    let values = column
        .values()
        .iter()
        .zip(mask)
        .map(|(v, on)| match (on, fill) {
            (true, _) => Some(*v),
            (false, MaskFill::Zero) => Some(0.0),
            (false, MaskFill::Undefined) => None,
        })
        .collect();

    MaskedColumn {
        name: column.name().to_string(),
        unit: column.unit().clone(),
        values,
    }
}
