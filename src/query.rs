use std::fmt;

use crate::delegate::Delegate;
use crate::error::SqlDelegateError;
use crate::markers::{MAX_PARAMETERS, highest_marker};
use crate::types::RowValues;

/// One argument slot of a [`Query`], aligned with a `$n` marker in its SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(RowValues),
    Delegate(Delegate),
}

impl From<RowValues> for Arg {
    fn from(value: RowValues) -> Self {
        Arg::Value(value)
    }
}

impl From<Delegate> for Arg {
    fn from(delegate: Delegate) -> Self {
        Arg::Delegate(delegate)
    }
}

/// A SQL string and its ordered argument slots bundled together.
///
/// Slot `i` feeds marker `$(i + 1)`. Slots are either concrete values or delegates that are
/// resolved right before the arguments are sent:
/// ```rust
/// use sql_delegate::prelude::*;
///
/// let query = Query::with_args(
///     "INSERT INTO t (id, name) VALUES ($1, $2)",
///     vec![Arg::Value(RowValues::Int(1)), Arg::Delegate(delegate("name"))],
/// );
/// assert!(query.has_delegates());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    sql: String,
    args: Vec<Arg>,
}

impl Query {
    /// Query whose slots are all concrete values.
    pub fn new(sql: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            sql: sql.into(),
            args: params.into_iter().map(Arg::Value).collect(),
        }
    }

    pub fn new_without_params(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(sql: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Template with one positional delegate per parameter marker found in `sql`.
    ///
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` when a marker exceeds [`MAX_PARAMETERS`].
    pub fn from_template(sql: impl Into<String>) -> Result<Self, SqlDelegateError> {
        let sql = sql.into();
        let count = expected_params(&sql)?;
        Ok(Self {
            sql,
            args: (0..count)
                .map(|_| Arg::Delegate(Delegate::positional()))
                .collect(),
        })
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Arg>) {
        (self.sql, self.args)
    }

    #[must_use]
    pub fn has_delegates(&self) -> bool {
        self.args.iter().any(|arg| matches!(arg, Arg::Delegate(_)))
    }

    pub fn delegates(&self) -> impl Iterator<Item = &Delegate> {
        self.args.iter().filter_map(|arg| match arg {
            Arg::Delegate(delegate) => Some(delegate),
            Arg::Value(_) => None,
        })
    }

    /// Check that the SQL expects exactly as many parameters as there are slots.
    ///
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` on a mismatch or when a marker exceeds
    /// [`MAX_PARAMETERS`].
    pub fn validate(&self) -> Result<(), SqlDelegateError> {
        let expected = expected_params(&self.sql)?;
        if expected == self.args.len() {
            Ok(())
        } else {
            Err(SqlDelegateError::ConfigError(format!(
                "query expects {expected} parameter(s) but carries {} argument(s)",
                self.args.len()
            )))
        }
    }

    /// The slot values, for queries that carry no delegates.
    ///
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` naming the first delegate found; such queries
    /// must go through a prepared statement.
    pub fn concrete_params(&self) -> Result<Vec<RowValues>, SqlDelegateError> {
        self.args
            .iter()
            .map(|arg| match arg {
                Arg::Value(value) => Ok(value.clone()),
                Arg::Delegate(delegate) => Err(SqlDelegateError::ConfigError(format!(
                    "placeholder `{}` can only be bound through a prepared statement",
                    delegate_label(delegate)
                ))),
            })
            .collect()
    }
}

fn delegate_label(delegate: &Delegate) -> &str {
    if delegate.is_positional() {
        "<positional>"
    } else {
        delegate.name()
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Query::new_without_params(sql)
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Query::new_without_params(sql)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LIMIT: usize = 497;
        match self.sql.char_indices().nth(LIMIT) {
            Some((cut, _)) => write!(f, "{}...", &self.sql[..cut]),
            None => f.write_str(&self.sql),
        }
    }
}

fn expected_params(sql: &str) -> Result<usize, SqlDelegateError> {
    let highest = highest_marker(sql);
    if highest > MAX_PARAMETERS {
        return Err(SqlDelegateError::ConfigError(format!(
            "parameter marker ${highest} exceeds the limit of {MAX_PARAMETERS}"
        )));
    }
    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::delegate;

    #[test]
    fn template_gets_one_slot_per_marker() {
        let query =
            Query::from_template("select * from t where a = $1 or b = $2 or c = $1").unwrap();
        assert_eq!(query.args().len(), 2);
        assert!(query.delegates().all(Delegate::is_positional));
        assert!(query.validate().is_ok());
    }

    #[test]
    fn markers_past_the_protocol_limit_are_rejected() {
        assert!(Query::from_template("select $65535").is_ok());
        let err = Query::from_template("select $2000000000").unwrap_err();
        assert!(matches!(err, SqlDelegateError::ConfigError(ref m) if m.contains("$2000000000")));

        let query = Query::with_args("select $70000", Vec::new());
        assert!(matches!(
            query.validate(),
            Err(SqlDelegateError::ConfigError(_))
        ));
    }

    #[test]
    fn validate_rejects_mismatched_slots() {
        let query = Query::new("select $1, $2", vec![RowValues::Int(1)]);
        assert!(matches!(
            query.validate(),
            Err(SqlDelegateError::ConfigError(_))
        ));
    }

    #[test]
    fn concrete_params_refuse_delegates() {
        let query = Query::with_args("select $1", vec![Arg::Delegate(delegate("id"))]);
        assert!(query.concrete_params().is_err());
        let query = Query::new("select $1", vec![RowValues::Int(3)]);
        assert_eq!(query.concrete_params().unwrap(), vec![RowValues::Int(3)]);
    }
}
