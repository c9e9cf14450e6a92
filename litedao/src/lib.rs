///
/// litedao - A fluent, typed data-access layer over embedded SQLite
///
/// This crate provides a small DAO stack on top of rusqlite:
///
/// - value: the `Value` scalar variant with total, rule-ordered type
///   conversion, plus the ordered `Values` row map
/// - table: the in-memory `Table` result buffer with case-insensitive,
///   insertion-ordered columns
/// - command: SQL text plus named `:placeholder` bindings
/// - session: the `Session` connection owner, its execute pipeline,
///   scoped transactions, and statement interruption
/// - adapter: the `TableAdapter` immutable query builder
/// - error: the `DaoError` taxonomy
///
/// Entry points:
/// - `Session::open` / `Session::open_in_memory`: acquire an engine handle
/// - `TableAdapter::new`: compose and run queries against one table
///

pub mod adapter;
pub mod command;
pub mod error;
pub mod session;
pub mod table;
pub mod value;

pub use adapter::TableAdapter;
pub use command::Command;
pub use error::DaoError;
pub use session::{Session, Transaction, Window};
pub use table::{Row, Table};
pub use value::{FromValue, Value, Values};

#[test]
fn test_readme_flow() {
    use std::sync::Arc;

    let session = Arc::new(Session::new());
    session.open_in_memory().unwrap();
    let adapter = TableAdapter::new(session, "test_table");

    adapter.create_table(
        "id integer primary key,\
         name text,\
         age int,\
         image blob",
    );

    adapter
        .insert(
            &Values::new()
                .set("id", 1)
                .set("name", "Tom")
                .set("age", 20)
                .set("image", vec![1u8, 2, 3]),
        )
        .unwrap();
    adapter
        .insert(&Values::new().set("id", 2).set("name", "Dick").set("age", 21))
        .unwrap();

    let mut t = Table::new();
    adapter.select(&mut t).unwrap();
    assert_eq!(t.row_count(), 2);

    adapter.with_filter("id=1").select(&mut t).unwrap();
    assert_eq!(t.row_count(), 1);
    let name: String = t.cell_by_name(0, "name").to().unwrap();
    assert_eq!(name, "Tom");

    adapter.delete(&Values::new().set("id", 1)).unwrap();
    adapter.delete(&Values::new()).unwrap();
    assert_eq!(adapter.row_count().unwrap(), 0);
}
