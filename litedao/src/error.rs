///
/// Data-access error types.
///
/// All errors that can surface from a session or adapter operation:
/// value coercion failures, closed-session use, statement compilation,
/// unbound placeholders, and engine-level failures.
///

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaoError {
    /// The stored variant has no valid coercion path to the requested type.
    #[error("invalid conversion: {0}")]
    Conversion(String),

    /// An operation was attempted on a session with no live handle.
    #[error("database is not open")]
    NotOpen,

    /// The SQL text failed to compile.
    #[error("failed to prepare statement: {0}")]
    Prepare(String),

    /// A placeholder in the SQL text has no bound value. This is a builder
    /// defect and is never silently defaulted.
    #[error("no value bound for placeholder ':{0}'")]
    MissingBinding(String),

    /// Statement execution terminated in neither a row nor done.
    #[error("statement did not run to completion: {0}")]
    Step(String),

    /// Any other engine failure (keying, I/O, constraint violations).
    #[error("database engine error: {0}")]
    Engine(String),
}

impl From<rusqlite::Error> for DaoError {
    fn from(err: rusqlite::Error) -> Self {
        DaoError::Engine(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = DaoError::Conversion("Text to blob".to_string());
        assert!(err.to_string().contains("invalid conversion"));
        assert!(err.to_string().contains("Text to blob"));

        let err = DaoError::NotOpen;
        assert_eq!(err.to_string(), "database is not open");

        let err = DaoError::Prepare("near \"selec\": syntax error".to_string());
        assert!(err.to_string().contains("failed to prepare"));
        assert!(err.to_string().contains("syntax error"));

        let err = DaoError::MissingBinding("name".to_string());
        assert!(err.to_string().contains(":name"));

        let err = DaoError::Step("interrupted".to_string());
        assert!(err.to_string().contains("interrupted"));
    }
}
