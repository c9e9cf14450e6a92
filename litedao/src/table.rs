///
/// In-Memory Result Table
///
/// An ordered column registry plus rows of [`Value`] cells, populated by
/// [`Session::execute`](crate::session::Session::execute) when the caller
/// supplies an output table. Column lookup is case-insensitive with
/// first-definition-wins semantics; looking up an unknown column name
/// yields a canonical empty cell rather than an error.
///

use indexmap::IndexMap;

use crate::value::Value;

static EMPTY_CELL: Value = Value::Null;

/// One materialized row. Width always equals the owning table's column
/// count; new rows start all-Null.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<Value>,
}

impl Row {
    fn with_width(width: usize) -> Self {
        Self {
            cells: vec![Value::Null; width],
        }
    }

    pub fn cell(&self, column: usize) -> &Value {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn set(&mut self, column: usize, value: Value) {
        if let Some(cell) = self.cells.get_mut(column) {
            *cell = value;
        }
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }
}

/// Ordered column set and row buffer.
#[derive(Debug, Clone, Default)]
pub struct Table {
    // lower-cased lookup key -> declared spelling; map order is column order
    columns: IndexMap<String, String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Idempotent under case-insensitive comparison: a
    /// duplicate name is silently ignored (first definition wins).
    pub fn add_column(&mut self, name: &str) {
        let key = name.to_lowercase();
        if !self.columns.contains_key(&key) {
            self.columns.insert(key, name.to_string());
        }
    }

    /// Append a row of Nulls sized to the current column count; returns
    /// the new row's index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(Row::with_width(self.columns.len()));
        self.rows.len() - 1
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The declared spelling of column `index`, in definition order.
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns
            .get_index(index)
            .map(|(_, name)| name.as_str())
    }

    /// Case-insensitive name lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(&name.to_lowercase())
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }

    /// Cell access by position; out-of-range access yields the empty cell.
    pub fn cell(&self, row: usize, column: usize) -> &Value {
        self.rows
            .get(row)
            .map(|r| r.cell(column))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Cell access by column name. An unknown name yields the canonical
    /// empty cell, never an error.
    pub fn cell_by_name(&self, row: usize, name: &str) -> &Value {
        match self.column_index(name) {
            Some(column) => self.cell(row, column),
            None => &EMPTY_CELL,
        }
    }

    pub fn set(&mut self, row: usize, column: usize, value: Value) {
        if let Some(r) = self.rows.get_mut(row) {
            r.set(column, value);
        }
    }

    /// Drop all rows; with `reset_columns` the column registry goes too.
    pub fn clear(&mut self, reset_columns: bool) {
        self.rows.clear();
        if reset_columns {
            self.columns.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_case_insensitive_first_wins() {
        let mut t = Table::new();
        t.add_column("Name");
        t.add_column("name");
        t.add_column("NAME");
        t.add_column("age");
        assert_eq!(t.column_count(), 2);
        assert_eq!(t.column_name(0), Some("Name"));
        assert_eq!(t.column_index("nAmE"), Some(0));
        assert_eq!(t.column_index("age"), Some(1));
    }

    #[test]
    fn test_new_rows_are_all_null_at_current_width() {
        let mut t = Table::new();
        t.add_column("a");
        t.add_column("b");
        let r = t.add_row();
        assert_eq!(r, 0);
        assert_eq!(t.row(0).unwrap().width(), 2);
        assert!(t.cell(0, 0).empty());
        assert!(t.cell(0, 1).empty());
    }

    #[test]
    fn test_unknown_name_yields_empty_cell() {
        let mut t = Table::new();
        t.add_column("id");
        t.add_row();
        t.set(0, 0, Value::Integer(7));
        assert_eq!(t.cell_by_name(0, "ID"), &Value::Integer(7));
        assert!(t.cell_by_name(0, "no_such_column").empty());
        assert!(t.cell_by_name(99, "id").empty());
    }

    #[test]
    fn test_clear_modes() {
        let mut t = Table::new();
        t.add_column("id");
        t.add_row();
        t.clear(false);
        assert_eq!(t.row_count(), 0);
        assert_eq!(t.column_count(), 1);
        t.add_row();
        t.clear(true);
        assert_eq!(t.row_count(), 0);
        assert_eq!(t.column_count(), 0);
    }
}
