//! Common tabular representation for CSV-backed sources.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One value in a [`DataTable`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Float(f64),
    Int(i64),
    Text(String),
    Date(NaiveDate),
    /// Missing / not-a-number.
    Null,
}

impl Cell {
    /// Numeric view of the cell. `Null` reads as NaN, text as None.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Int(v) => Some(*v as f64),
            Cell::Null => Some(f64::NAN),
            _ => None,
        }
    }

    /// Text view of the cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// A small indexed table: ordered column names, one index cell and one value
/// row per entry. This is the normalized output shape of the quote, component
/// and FRED fetchers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DataTable {
    /// Name of the index column ("symbol", "ticker", "DATE", ...).
    pub index_name: String,
    /// Value column names, in order.
    pub columns: Vec<String>,
    /// Index cell per row, parallel to `rows`.
    pub index: Vec<Cell>,
    /// Value cells per row, each the same length as `columns`.
    pub rows: Vec<Vec<Cell>>,
}

impl DataTable {
    pub fn new(index_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            index_name: index_name.into(),
            columns,
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. The value count must match the column count.
    pub fn push_row(&mut self, index: Cell, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.index.push(index);
        self.rows.push(values);
    }

    /// Position of a named column.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, column name).
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let pos = self.column_position(column)?;
        self.rows.get(row)?.get(pos)
    }

    /// Whether the index already contains this cell.
    pub fn contains_index(&self, cell: &Cell) -> bool {
        self.index.iter().any(|c| c == cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_lookup() {
        let mut table = DataTable::new("symbol", vec!["last".into(), "PE".into()]);
        table.push_row(
            Cell::Text("AAPL".into()),
            vec![Cell::Float(101.5), Cell::Float(15.2)],
        );
        table.push_row(Cell::Text("GOOG".into()), vec![Cell::Float(890.0), Cell::Null]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "last"), Some(&Cell::Float(101.5)));
        assert_eq!(table.get(1, "PE"), Some(&Cell::Null));
        assert!(table.get(1, "PE").unwrap().as_f64().unwrap().is_nan());
        assert!(table.contains_index(&Cell::Text("GOOG".into())));
        assert!(!table.contains_index(&Cell::Text("MSFT".into())));
    }

    #[test]
    fn test_cell_views() {
        assert_eq!(Cell::Int(3).as_f64(), Some(3.0));
        assert_eq!(Cell::Text("x".into()).as_f64(), None);
        assert_eq!(Cell::Text("x".into()).as_str(), Some("x"));
        assert!(Cell::Null.is_null());
    }
}
