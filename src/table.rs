//! Tabular data model: cell values, rows, tables, and filter replay.
//!
//! The analysis engines operate on an ordered sequence of rows, each a
//! mapping from column name to a loosely typed [`Value`]. Row order is the
//! ingestion order of the source data and is preserved through filtering.
//! No component mutates rows in place; filters produce index subsets into
//! the original table.

use std::collections::HashMap;
use std::fmt;

/// A single cell value.
///
/// Filtering and grouping use exact equality on the full value, including
/// `Null`, which forms its own group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// A numeric measurement or code.
    Number(f64),
    /// A categorical label.
    Text(String),
    /// A boolean flag.
    Bool(bool),
    /// A missing value.
    Null,
}

impl Value {
    /// Returns the contained number if this value is a finite number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Returns `true` if this value is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => write!(f, "(missing)"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Canonical hashable form of a [`Value`], used as a grouping key.
///
/// Numbers are keyed by their bit pattern with `-0.0` normalized to `0.0`
/// so that numerically equal values land in the same group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Number(u64),
    Text(String),
    Bool(bool),
    Null,
}

impl ValueKey {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Number(n) => {
                let n = if *n == 0.0 { 0.0 } else { *n };
                Self::Number(n.to_bits())
            }
            Value::Text(s) => Self::Text(s.clone()),
            Value::Bool(b) => Self::Bool(*b),
            Value::Null => Self::Null,
        }
    }
}

/// One row of data: a mapping from column name to value.
///
/// A column absent from the map reads as [`Value::Null`].
pub type DataRow = HashMap<String, Value>;

static NULL: Value = Value::Null;

/// An ordered, immutable table of data rows.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    rows: Vec<DataRow>,
}

impl Table {
    /// Create a table from rows, preserving their order.
    #[must_use]
    pub fn new(rows: Vec<DataRow>) -> Self {
        Self { rows }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The underlying rows, in ingestion order.
    #[must_use]
    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    /// Returns `true` if at least one row carries the column.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(column))
    }

    /// The value at `(row, column)`; missing cells read as `Null`.
    ///
    /// # Panics
    /// Panics if `row` is out of bounds.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> &Value {
        self.rows[row].get(column).unwrap_or(&NULL)
    }

    /// All row indices, in order.
    #[must_use]
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.rows.len()).collect()
    }

    /// Row indices surviving the filter sequence, in original order.
    ///
    /// Filters intersect, so replaying the same sequence (in any order)
    /// against the full table always reproduces the same subset.
    #[must_use]
    pub fn filter_indices(&self, filters: &[FilterAction]) -> Vec<usize> {
        (0..self.rows.len())
            .filter(|&i| filters.iter().all(|f| f.matches(&self.rows[i])))
            .collect()
    }

    /// Finite numeric values of `column` over the given row subset.
    #[must_use]
    pub fn numeric_column(&self, column: &str, indices: &[usize]) -> Vec<f64> {
        indices
            .iter()
            .filter_map(|&i| self.value(i, column).as_number())
            .collect()
    }

    /// `(factor value, outcome)` pairs over the given row subset, keeping
    /// only rows whose outcome is a finite number. The factor value may be
    /// any [`Value`], including `Null`.
    #[must_use]
    pub fn factor_outcome_pairs(
        &self,
        factor: &str,
        outcome: &str,
        indices: &[usize],
    ) -> Vec<(&Value, f64)> {
        indices
            .iter()
            .filter_map(|&i| {
                let y = self.value(i, outcome).as_number()?;
                Some((self.value(i, factor), y))
            })
            .collect()
    }
}

/// One step of an active drill path: keep rows whose `factor` value equals
/// any of `values`.
///
/// A sequence of filter actions fully describes a filtered dataset;
/// persistence collaborators store the sequence verbatim and replay it
/// through [`Table::filter_indices`] to reconstruct state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterAction {
    /// The column being filtered.
    pub factor: String,
    /// Accepted values (one for a categorical value, several for a
    /// numeric bucket).
    pub values: Vec<Value>,
}

impl FilterAction {
    /// Create a filter keeping rows where `factor` equals `value`.
    #[must_use]
    pub fn equals(factor: impl Into<String>, value: Value) -> Self {
        Self {
            factor: factor.into(),
            values: vec![value],
        }
    }

    /// Returns `true` if the row passes this filter.
    #[must_use]
    pub fn matches(&self, row: &DataRow) -> bool {
        let cell = row.get(&self.factor).unwrap_or(&NULL);
        self.values.iter().any(|v| v == cell)
    }
}
