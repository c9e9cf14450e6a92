///
/// Parameterized Command
///
/// An SQL template containing `:name` placeholders plus its name -> Value
/// binding map. Commands are built fresh per logical operation, consumed
/// once by [`Session::execute`](crate::session::Session::execute), then
/// discarded. The text is opaque here; placeholder discovery happens at
/// execution against the prepared statement.
///

use indexmap::IndexMap;

use crate::error::DaoError;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct Command {
    text: String,
    bindings: IndexMap<String, Value>,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bindings: IndexMap::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Bind a value to a placeholder name (without the `:` prefix).
    /// Rebinding the same name replaces the earlier value.
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) {
        self.bindings.insert(name.to_string(), value.into());
    }

    /// Look up a binding. A placeholder present in the SQL text with no
    /// bound value is a builder defect and surfaces immediately.
    pub fn bound(&self, name: &str) -> Result<&Value, DaoError> {
        self.bindings
            .get(name)
            .ok_or_else(|| DaoError::MissingBinding(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_upserts_last_write_wins() {
        let mut cmd = Command::new("update [t] set a=:a");
        cmd.bind("a", 1);
        cmd.bind("a", "two");
        assert_eq!(cmd.bound("a").unwrap(), &Value::Text("two".to_string()));
    }

    #[test]
    fn test_missing_binding_names_placeholder() {
        let cmd = Command::new("select * from [t] where id=:id");
        match cmd.bound("id") {
            Err(DaoError::MissingBinding(name)) => assert_eq!(name, "id"),
            other => panic!("expected MissingBinding, got {other:?}"),
        }
    }

    #[test]
    fn test_set_text_replaces_template() {
        let mut cmd = Command::new("");
        cmd.set_text("select 1");
        assert_eq!(cmd.text(), "select 1");
    }
}
