///
/// TableAdapter - Fluent Query Builder
///
/// An immutable builder over one target table: projection columns,
/// conjunctive WHERE fragments, and an optional row window accumulate via
/// copy-on-write operators, so query fragments can be branched and reused
/// without aliasing surprises:
///
/// ```ignore
/// let people = TableAdapter::new(session, "people");
/// let adults = people.with_filter("age >= 18");
/// adults.with_window(0, 10).select(&mut page)?;   // people is untouched
/// ```
///
/// The lowering operators (insert/delete/update/select/row_count) build a
/// [`Command`] with `:name` placeholders and bracketed identifiers and run
/// it through the shared [`Session`].
///

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::command::Command;
use crate::error::DaoError;
use crate::session::{Session, Window};
use crate::table::Table;
use crate::value::Values;

#[derive(Clone)]
pub struct TableAdapter {
    session: Arc<Session>,
    table: String,
    columns: Vec<String>,
    filters: Vec<String>,
    window: Option<Window>,
}

impl TableAdapter {
    /// Target `table` through an existing session. Multiple adapters may
    /// share one session, one per table.
    pub fn new(session: Arc<Session>, table: impl Into<String>) -> Self {
        Self {
            session,
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            window: None,
        }
    }

    /// Convenience constructor that opens its own session on `path`.
    pub fn open(table: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, DaoError> {
        let session = Session::new();
        session.open(path)?;
        Ok(Self::new(Arc::new(session), table))
    }

    /// Like [`TableAdapter::open`], keying the database first.
    pub fn open_with_passphrase(
        table: impl Into<String>,
        path: impl AsRef<Path>,
        passphrase: &str,
    ) -> Result<Self, DaoError> {
        let session = Session::new();
        session.open_with_passphrase(path, passphrase)?;
        Ok(Self::new(Arc::new(session), table))
    }

    /// Retarget the adapter at another table, keeping session, projection,
    /// filters, and window.
    pub fn with_table(&self, table: impl Into<String>) -> Self {
        let mut other = self.clone();
        other.table = table.into();
        other
    }

    /// Append a column to the projection list, which doubles as the
    /// allowlist for insert/update keys.
    pub fn with_column(&self, column: impl Into<String>) -> Self {
        let mut other = self.clone();
        other.columns.push(column.into());
        other
    }

    /// Append a conjunctive WHERE fragment. The first fragment introduces
    /// the `where` keyword, later ones are joined with `and`.
    pub fn with_filter(&self, clause: impl Into<String>) -> Self {
        let mut other = self.clone();
        other.filters.push(clause.into());
        other
    }

    /// Replace the row window: materialize `count` rows starting at `start`.
    pub fn with_window(&self, start: u64, count: u64) -> Self {
        let mut other = self.clone();
        other.window = Some(Window::new(start, count));
        other
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn projection(&self) -> &[String] {
        &self.columns
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Insert one row. Keys pass through the column allowlist when one was
    /// declared; with no declared columns every key participates.
    pub fn insert(&self, values: &Values) -> Result<usize, DaoError> {
        let mut keys = String::new();
        let mut placeholders = String::new();
        let mut cmd = Command::new("");
        for (key, value) in values.iter() {
            if !self.columns.is_empty() && !self.name_in_columns(key) {
                continue;
            }
            if !keys.is_empty() {
                keys.push(',');
                placeholders.push(',');
            }
            keys.push_str(key);
            placeholders.push(':');
            placeholders.push_str(key);
            cmd.bind(key, value.clone());
        }
        cmd.set_text(format!(
            "insert into [{}]({}) values({})",
            self.table, keys, placeholders
        ));
        self.session.execute(&cmd, None, None)
    }

    /// Delete rows matching the adapter's filters plus one equality per
    /// key in `values`. With no filters and an empty `values` this is an
    /// unconditional `delete from [table]` that removes every row - a
    /// deliberate delete-all default that callers must guard themselves.
    pub fn delete(&self, values: &Values) -> Result<usize, DaoError> {
        let mut conds = self.where_clause();
        let mut cmd = Command::new("");
        for (key, value) in values.iter() {
            if conds.is_empty() {
                conds.push_str("where ");
            } else {
                conds.push_str(" and ");
            }
            conds.push_str(key);
            conds.push_str("=:");
            conds.push_str(key);
            cmd.bind(key, value.clone());
        }
        let text = if conds.is_empty() {
            format!("delete from [{}]", self.table)
        } else {
            format!("delete from [{}] {}", self.table, conds)
        };
        cmd.set_text(text);
        self.session.execute(&cmd, None, None)
    }

    /// Update rows matching the adapter's filters, setting every key that
    /// passes the allowlist. With `upsert`, zero affected rows falls back
    /// to [`TableAdapter::insert`].
    pub fn update(&self, values: &Values, upsert: bool) -> Result<usize, DaoError> {
        let mut sets = String::new();
        let mut cmd = Command::new("");
        for (key, value) in values.iter() {
            if !self.columns.is_empty() && !self.name_in_columns(key) {
                continue;
            }
            if !sets.is_empty() {
                sets.push_str(", ");
            }
            sets.push_str(key);
            sets.push_str("=:");
            sets.push_str(key);
            cmd.bind(key, value.clone());
        }
        cmd.set_text(
            format!("update [{}] set {} {}", self.table, sets, self.where_clause())
                .trim_end()
                .to_string(),
        );
        let affected = self.session.execute(&cmd, None, None)?;
        if affected == 0 && upsert {
            return self.insert(values);
        }
        Ok(affected)
    }

    /// Materialize the projected columns of matching rows into `out`,
    /// honoring the adapter's window.
    pub fn select(&self, out: &mut Table) -> Result<(), DaoError> {
        let sql = format!(
            "select {} from [{}] {}",
            self.select_columns(),
            self.table,
            self.where_clause()
        );
        let cmd = Command::new(sql.trim_end());
        self.session.execute(&cmd, Some(out), self.window)?;
        Ok(())
    }

    /// Total row count of the target table, ignoring projection, filters,
    /// and window.
    pub fn row_count(&self) -> Result<i64, DaoError> {
        let mut out = Table::new();
        let cmd = Command::new(format!("select count(*) from [{}]", self.table));
        self.session.execute(&cmd, Some(&mut out), None)?;
        out.cell(0, 0).to_i64()
    }

    /// Idempotent convenience creation: delegates to the session's strict
    /// create and discards the failure, since "already exists" is the
    /// expected outcome on every call after the first.
    pub fn create_table(&self, column_defs: &str) {
        if let Err(err) = self.session.create_table(&self.table, column_defs) {
            debug!(table = %self.table, %err, "create table skipped");
        }
    }

    fn select_columns(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        }
    }

    fn where_clause(&self) -> String {
        if self.filters.is_empty() {
            String::new()
        } else {
            format!("where {}", self.filters.join(" and "))
        }
    }

    fn name_in_columns(&self, name: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.to_lowercase() == name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn adapter() -> TableAdapter {
        let session = Session::new();
        session.open_in_memory().expect("in-memory open");
        TableAdapter::new(Arc::new(session), "test_table")
    }

    #[test]
    fn test_operators_are_copy_on_write() {
        let base = adapter();
        let projected = base.with_column("x");
        let filtered = projected.with_filter("x > 1").with_filter("x < 9");
        let windowed = filtered.with_window(5, 10);

        assert!(base.projection().is_empty());
        assert!(base.filters().is_empty());
        assert!(base.window().is_none());
        assert_eq!(projected.projection(), ["x".to_string()]);
        assert!(projected.filters().is_empty());
        assert_eq!(filtered.filters().len(), 2);
        assert!(filtered.window().is_none());
        assert_eq!(windowed.window(), Some(Window::new(5, 10)));

        let other = base.with_table("other");
        assert_eq!(base.table(), "test_table");
        assert_eq!(other.table(), "other");
    }

    #[test]
    fn test_insert_respects_column_allowlist() {
        let a = adapter();
        a.create_table("id integer, name text");
        let restricted = a.with_column("id").with_column("NAME");
        restricted
            .insert(
                &Values::new()
                    .set("id", 1)
                    .set("name", "Tom")
                    .set("stray", 9.5),
            )
            .expect("insert");

        let mut out = Table::new();
        a.select(&mut out).expect("select");
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.cell_by_name(0, "id"), &Value::Integer(1));
        assert_eq!(out.cell_by_name(0, "name"), &Value::Text("Tom".to_string()));
    }

    #[test]
    fn test_create_table_convenience_is_idempotent() {
        let a = adapter();
        a.create_table("id integer");
        a.create_table("id integer");
        a.insert(&Values::new().set("id", 1)).expect("insert");
        assert_eq!(a.row_count().unwrap(), 1);
    }

    #[test]
    fn test_row_count_ignores_filters_and_window() {
        let a = adapter();
        a.create_table("id integer");
        for id in 0..4 {
            a.insert(&Values::new().set("id", id)).unwrap();
        }
        let narrowed = a.with_filter("id = 1").with_window(0, 1);
        assert_eq!(narrowed.row_count().unwrap(), 4);
    }
}
