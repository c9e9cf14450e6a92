///
/// Session - Engine Handle Owner
///
/// A `Session` exclusively owns one live SQLite handle and serializes all
/// access to it behind a single mutex. The execute pipeline turns a
/// [`Command`] into a prepared statement, binds every named placeholder
/// from the command's binding map, steps the statement, and materializes
/// result rows into the caller's [`Table`].
///
/// Transactions are scoped: [`Session::transaction`] returns a guard that
/// holds the connection lock for its whole lifetime and exposes `execute`
/// itself, so nested lock acquisition cannot be expressed. Dropping an
/// uncommitted scope rolls back.
///
/// [`Session::abort`] interrupts an in-flight statement from any thread;
/// the interrupt handle lives outside the connection lock.
///

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, InterruptHandle};
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::DaoError;
use crate::table::Table;
use crate::value::Value;

/// A row window: materialize `count` rows starting at row `start`.
/// Lowered to a ` limit start, count` clause on the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u64,
    pub count: u64,
}

impl Window {
    pub fn new(start: u64, count: u64) -> Self {
        Self { start, count }
    }
}

#[derive(Default)]
struct Inner {
    conn: Option<Connection>,
    source: Option<PathBuf>,
}

/// Exclusive owner of the live engine handle and its transaction state.
/// Cheap to share behind an `Arc`; concurrent callers are fully serialized.
#[derive(Default)]
pub struct Session {
    inner: Mutex<Inner>,
    interrupt: Mutex<Option<InterruptHandle>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a handle for the database file at `path`.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<(), DaoError> {
        self.open_impl(path.as_ref(), None)
    }

    /// Acquire a handle and apply `passphrase` as the decryption key
    /// before any statement is prepared.
    pub fn open_with_passphrase(
        &self,
        path: impl AsRef<Path>,
        passphrase: &str,
    ) -> Result<(), DaoError> {
        self.open_impl(path.as_ref(), Some(passphrase))
    }

    /// Acquire a handle to a fresh in-memory database.
    pub fn open_in_memory(&self) -> Result<(), DaoError> {
        let mut inner = self.inner.lock().unwrap();
        let conn = Connection::open_in_memory()?;
        *self.interrupt.lock().unwrap() = Some(conn.get_interrupt_handle());
        inner.conn = Some(conn);
        inner.source = None;
        Ok(())
    }

    fn open_impl(&self, path: &Path, passphrase: Option<&str>) -> Result<(), DaoError> {
        let mut inner = self.inner.lock().unwrap();
        let conn = Connection::open(path)?;
        if let Some(pass) = passphrase {
            conn.pragma_update(None, "key", pass)?;
        }
        *self.interrupt.lock().unwrap() = Some(conn.get_interrupt_handle());
        inner.conn = Some(conn);
        inner.source = Some(path.to_path_buf());
        debug!(path = %path.display(), "session opened");
        Ok(())
    }

    /// Release the handle. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.conn = None;
        inner.source = None;
        *self.interrupt.lock().unwrap() = None;
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().unwrap().conn.is_some()
    }

    /// The path this session was opened on, if it is a file-backed source.
    pub fn source(&self) -> Option<PathBuf> {
        self.inner.lock().unwrap().source.clone()
    }

    /// Execute one command. When `out` is supplied it is reset and
    /// repopulated with the result set; `window` appends a limit clause.
    /// Returns the engine's affected-row count.
    pub fn execute(
        &self,
        cmd: &Command,
        out: Option<&mut Table>,
        window: Option<Window>,
    ) -> Result<usize, DaoError> {
        let inner = self.inner.lock().unwrap();
        let conn = inner.conn.as_ref().ok_or(DaoError::NotOpen)?;
        run_statement(conn, cmd, out, window)
    }

    /// Batch-execute raw SQL (DDL, pragmas). No bindings, no results.
    pub fn exec(&self, sql: &str) -> Result<(), DaoError> {
        let inner = self.inner.lock().unwrap();
        let conn = inner.conn.as_ref().ok_or(DaoError::NotOpen)?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Strict table creation: fails with the engine error if the table
    /// already exists. The adapter layers idempotent semantics on top.
    pub fn create_table(&self, name: &str, column_defs: &str) -> Result<(), DaoError> {
        let cmd = Command::new(format!("create table [{name}]({column_defs})"));
        self.execute(&cmd, None, None)?;
        Ok(())
    }

    /// Begin a transaction scope. The returned guard holds the connection
    /// lock until it commits or drops; dropping uncommitted rolls back.
    pub fn transaction(&self) -> Result<Transaction<'_>, DaoError> {
        let guard = self.inner.lock().unwrap();
        guard
            .conn
            .as_ref()
            .ok_or(DaoError::NotOpen)?
            .execute_batch("begin transaction")?;
        debug!("transaction begun");
        Ok(Transaction {
            guard,
            committed: false,
        })
    }

    /// Request interruption of the in-flight statement. Callable from any
    /// thread; does not take the connection lock. The interrupted call
    /// surfaces a step error and releases the lock on its own unwind path.
    pub fn abort(&self) {
        if let Some(handle) = self.interrupt.lock().unwrap().as_ref() {
            handle.interrupt();
        }
    }
}

/// An open transaction scope. Exactly one of commit/rollback runs on every
/// exit path, and the connection lock is released exactly once.
pub struct Transaction<'a> {
    guard: MutexGuard<'a, Inner>,
    committed: bool,
}

impl Transaction<'_> {
    /// Execute a command inside the transaction.
    pub fn execute(
        &mut self,
        cmd: &Command,
        out: Option<&mut Table>,
        window: Option<Window>,
    ) -> Result<usize, DaoError> {
        let conn = self.guard.conn.as_ref().ok_or(DaoError::NotOpen)?;
        run_statement(conn, cmd, out, window)
    }

    /// Commit the scope. On commit failure a best-effort rollback runs
    /// and the original commit error is surfaced.
    pub fn commit(mut self) -> Result<(), DaoError> {
        self.committed = true;
        let conn = self.guard.conn.as_ref().ok_or(DaoError::NotOpen)?;
        if let Err(commit_err) = conn.execute_batch("commit transaction") {
            let _ = conn.execute_batch("rollback transaction");
            return Err(commit_err.into());
        }
        debug!("transaction committed");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            if let Some(conn) = self.guard.conn.as_ref() {
                let _ = conn.execute_batch("rollback transaction");
            }
            debug!("transaction rolled back");
        }
    }
}

/// The execute pipeline: limit clause, prepare, bind-by-name, declare
/// output columns, step and decode, report affected rows.
fn run_statement(
    conn: &Connection,
    cmd: &Command,
    mut out: Option<&mut Table>,
    window: Option<Window>,
) -> Result<usize, DaoError> {
    let mut text = cmd.text().to_string();
    if let Some(w) = window {
        text.push_str(&format!(" limit {}, {}", w.start, w.count));
    }
    debug!(sql = %text, "executing statement");

    let mut stmt = conn
        .prepare(&text)
        .map_err(|e| DaoError::Prepare(e.to_string()))?;

    // Resolve every placeholder the prepared statement reports, strip the
    // ':' prefix, and bind the command's value at the matching ordinal.
    let placeholders: Vec<(usize, String)> = (1..=stmt.parameter_count())
        .filter_map(|ordinal| {
            stmt.parameter_name(ordinal)
                .map(|name| (ordinal, name.trim_start_matches(':').to_string()))
        })
        .collect();
    for (ordinal, name) in &placeholders {
        let value = cmd.bound(name)?;
        trace!(placeholder = %name, kind = value.type_name(), "binding parameter");
        stmt.raw_bind_parameter(*ordinal, value)?;
    }

    let column_count = stmt.column_count();
    if let Some(table) = out.as_deref_mut() {
        table.clear(true);
        for index in 0..column_count {
            let name = stmt.column_name(index)?;
            table.add_column(name);
        }
    }

    let mut rows = stmt.raw_query();
    loop {
        match rows.next() {
            Ok(Some(row)) => {
                if let Some(table) = out.as_deref_mut() {
                    let row_index = table.add_row();
                    for column in 0..column_count {
                        let cell = row
                            .get_ref(column)
                            .map_err(|e| DaoError::Step(e.to_string()))?;
                        table.set(row_index, column, Value::from(cell));
                    }
                }
            }
            Ok(None) => break,
            Err(e) => return Err(DaoError::Step(e.to_string())),
        }
    }

    Ok(conn.changes() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> Session {
        let session = Session::new();
        session.open_in_memory().expect("in-memory open");
        session
            .exec("create table [t](id integer, name text)")
            .expect("create");
        session
    }

    #[test]
    fn test_execute_requires_open_handle() {
        let session = Session::new();
        let err = session
            .execute(&Command::new("select 1"), None, None)
            .unwrap_err();
        assert!(matches!(err, DaoError::NotOpen));
        assert!(!session.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let session = scratch();
        assert!(session.is_open());
        session.close();
        session.close();
        assert!(!session.is_open());
    }

    #[test]
    fn test_unbound_placeholder_surfaces_at_execute() {
        let session = scratch();
        let mut cmd = Command::new("insert into [t](id, name) values(:id, :name)");
        cmd.bind("id", 1);
        let err = session.execute(&cmd, None, None).unwrap_err();
        match err {
            DaoError::MissingBinding(name) => assert_eq!(name, "name"),
            other => panic!("expected MissingBinding, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_sql_is_a_prepare_error() {
        let session = scratch();
        let err = session
            .execute(&Command::new("selec oops"), None, None)
            .unwrap_err();
        assert!(matches!(err, DaoError::Prepare(_)));
    }

    #[test]
    fn test_bind_and_materialize_by_variant() {
        let session = Session::new();
        session.open_in_memory().unwrap();
        session
            .exec("create table [t](i integer, f real, s text, b blob, n integer)")
            .unwrap();

        let mut cmd = Command::new(
            "insert into [t](i, f, s, b, n) values(:i, :f, :s, :b, :n)",
        );
        cmd.bind("i", 42);
        cmd.bind("f", 1.5);
        cmd.bind("s", "Tom");
        cmd.bind("b", vec![1u8, 2, 3]);
        cmd.bind("n", Value::Null);
        assert_eq!(session.execute(&cmd, None, None).unwrap(), 1);

        let mut out = Table::new();
        session
            .execute(&Command::new("select * from [t]"), Some(&mut out), None)
            .unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.column_count(), 5);
        assert_eq!(out.cell_by_name(0, "i"), &Value::Integer(42));
        assert_eq!(out.cell_by_name(0, "f"), &Value::Float(1.5));
        assert_eq!(out.cell_by_name(0, "s"), &Value::Text("Tom".to_string()));
        assert_eq!(out.cell_by_name(0, "b"), &Value::Blob(vec![1, 2, 3]));
        assert!(out.cell_by_name(0, "n").empty());
    }

    #[test]
    fn test_empty_blob_binds_sql_null() {
        let session = scratch();
        let mut cmd = Command::new("insert into [t](id, name) values(:id, :name)");
        cmd.bind("id", 1);
        cmd.bind("name", Value::Blob(Vec::new()));
        session.execute(&cmd, None, None).unwrap();

        let mut out = Table::new();
        session
            .execute(
                &Command::new("select name from [t] where name is null"),
                Some(&mut out),
                None,
            )
            .unwrap();
        assert_eq!(out.row_count(), 1);
        assert!(out.cell(0, 0).empty());
    }

    #[test]
    fn test_window_limits_materialized_rows() {
        let session = scratch();
        for id in 1..=3i64 {
            let mut cmd = Command::new("insert into [t](id, name) values(:id, :name)");
            cmd.bind("id", id);
            cmd.bind("name", format!("row{id}"));
            session.execute(&cmd, None, None).unwrap();
        }
        let mut out = Table::new();
        session
            .execute(
                &Command::new("select id from [t]"),
                Some(&mut out),
                Some(Window::new(1, 1)),
            )
            .unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.cell(0, 0), &Value::Integer(2));
    }

    #[test]
    fn test_strict_create_table_fails_on_existing() {
        let session = scratch();
        let err = session.create_table("t", "id integer").unwrap_err();
        assert!(matches!(err, DaoError::Prepare(_)));
    }
}
