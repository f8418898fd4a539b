//! Tabular output assembly.
//!
//! Every profile ultimately produces an [`OutputTable`]: a fixed header
//! row plus one [`Cell`] row per extracted line item, with aggregate
//! blocks overlaid on the leading rows of each file.

use rust_decimal::Decimal;
use serde::Serialize;

/// A single output cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// An empty cell.
    #[default]
    Empty,
    /// A text cell.
    Text(String),
    /// A decimal number (quantities, prices, amounts).
    Number(Decimal),
    /// An integer (counts, trip totals).
    Int(i64),
}

impl Cell {
    /// Text cell from anything string-like.
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Text cell from an optional value, `Empty` when absent.
    pub fn opt_text(value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => Cell::Text(v.into()),
            None => Cell::Empty,
        }
    }

    /// Number cell from an optional decimal, `Empty` when absent.
    pub fn opt_number(value: Option<Decimal>) -> Self {
        match value {
            Some(v) => Cell::Number(v),
            None => Cell::Empty,
        }
    }

    /// True when the cell holds nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric value for spreadsheet writers, `None` for text cells.
    pub fn as_f64(&self) -> Option<f64> {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            Cell::Number(d) => d.to_f64(),
            Cell::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String rendering used by CSV output and tests.
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(d) => d.to_string(),
            Cell::Int(i) => i.to_string(),
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

/// Column-ordered table produced by one profile run.
#[derive(Debug, Clone, Serialize)]
pub struct OutputTable {
    /// Column headers, fixed per profile.
    pub columns: Vec<&'static str>,

    /// Data rows. Each row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<Cell>>,
}

impl OutputTable {
    /// Empty table over the given column set.
    pub fn new(columns: Vec<&'static str>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, padding or truncating to the column count so a
    /// short profile row can never skew later columns.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Append every row of `other` followed by one blank separator
    /// row, so every block ends with a separator. Empty blocks
    /// contribute nothing. Column sets must match; per-file tables
    /// within a batch always share the profile's fixed header.
    pub fn append(&mut self, other: OutputTable) {
        debug_assert_eq!(self.columns, other.columns);
        if other.rows.is_empty() {
            return;
        }
        self.rows.extend(other.rows);
        self.rows.push(vec![Cell::Empty; self.columns.len()]);
    }

    /// Index of a column by header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == name)
    }
}
