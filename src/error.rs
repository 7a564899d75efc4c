use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlDelegateError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No value supplied for placeholder `{0}`")]
    UnresolvedPlaceholder(String),

    #[error("Replacement `{0}` does not match any placeholder of the query")]
    UnknownPlaceholder(String),

    #[error("Prepared statement is closed")]
    StatementClosed,

    #[error("A transaction is already open on this connection")]
    NestedTransaction,

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("{error}; rollback also failed: {rollback}")]
    RollbackFailed {
        error: Box<SqlDelegateError>,
        rollback: Box<SqlDelegateError>,
    },
}

impl SqlDelegateError {
    /// Name of the placeholder this error is about, for the resolution errors.
    #[must_use]
    pub fn placeholder(&self) -> Option<&str> {
        match self {
            Self::UnresolvedPlaceholder(name) | Self::UnknownPlaceholder(name) => Some(name),
            _ => None,
        }
    }
}
