use crate::delegate::Operand;
use crate::error::SqlDelegateError;

use super::SqlWriter;

/// `INSERT` of one or more rows given as `(column, operand)` lists.
///
/// Every row must name the same columns in the same order as the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: String,
    rows: Vec<Vec<(String, Operand)>>,
    returning: Vec<String>,
}

impl Insert {
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Vec::new(),
            returning: Vec::new(),
        }
    }

    #[must_use]
    pub fn row<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        self.rows.push(
            row.into_iter()
                .map(|(column, operand)| (column.into(), operand.into()))
                .collect(),
        );
        self
    }

    #[must_use]
    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returning.extend(columns.into_iter().map(Into::into));
        self
    }

    pub(super) fn write(&self, w: &mut SqlWriter) -> Result<(), SqlDelegateError> {
        let Some(first) = self.rows.first() else {
            return Err(SqlDelegateError::ConfigError(format!(
                "insert into `{}` has no rows",
                self.table
            )));
        };
        let columns: Vec<&str> = first.iter().map(|(column, _)| column.as_str()).collect();
        for row in &self.rows[1..] {
            if !row.iter().map(|(column, _)| column.as_str()).eq(columns.iter().copied()) {
                return Err(SqlDelegateError::ConfigError(format!(
                    "insert into `{}` mixes rows with different columns",
                    self.table
                )));
            }
        }

        w.push("INSERT INTO ");
        w.push_identifier(&self.table)?;
        if columns.is_empty() {
            if self.rows.len() > 1 {
                return Err(SqlDelegateError::ConfigError(format!(
                    "insert into `{}` repeats an empty row",
                    self.table
                )));
            }
            w.push(" DEFAULT VALUES");
        } else {
            w.push(" (");
            w.push_identifiers(&columns)?;
            w.push(") VALUES ");
            for (i, row) in self.rows.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                write_tuple(w, row.iter().map(|(_, operand)| operand));
            }
        }
        w.push_returning(&self.returning)
    }
}

/// `UPDATE table SET ... WHERE ...`; a missing filter updates every row.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: String,
    assignments: Vec<(String, Operand)>,
    conditions: Vec<(String, Operand)>,
    returning: Vec<String>,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            conditions: Vec::new(),
            returning: Vec::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.assignments.push((column.into(), operand.into()));
        self
    }

    #[must_use]
    pub fn set_all<I>(mut self, assignments: I) -> Self
    where
        I: IntoIterator<Item = (String, Operand)>,
    {
        self.assignments.extend(assignments);
        self
    }

    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.conditions.push((column.into(), operand.into()));
        self
    }

    #[must_use]
    pub fn filters<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (String, Operand)>,
    {
        self.conditions.extend(conditions);
        self
    }

    #[must_use]
    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returning.extend(columns.into_iter().map(Into::into));
        self
    }

    pub(super) fn write(&self, w: &mut SqlWriter) -> Result<(), SqlDelegateError> {
        if self.assignments.is_empty() {
            return Err(SqlDelegateError::ConfigError(format!(
                "update of `{}` assigns nothing",
                self.table
            )));
        }
        w.push("UPDATE ");
        w.push_identifier(&self.table)?;
        w.push(" SET ");
        for (i, (column, operand)) in self.assignments.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_identifier(column)?;
            w.push(" = ");
            w.push_operand(operand);
        }
        w.push_conditions(&self.conditions)?;
        w.push_returning(&self.returning)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    table: String,
    conditions: Vec<(String, Operand)>,
    returning: Vec<String>,
}

impl Delete {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            returning: Vec::new(),
        }
    }

    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.conditions.push((column.into(), operand.into()));
        self
    }

    #[must_use]
    pub fn filters<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (String, Operand)>,
    {
        self.conditions.extend(conditions);
        self
    }

    #[must_use]
    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returning.extend(columns.into_iter().map(Into::into));
        self
    }

    pub(super) fn write(&self, w: &mut SqlWriter) -> Result<(), SqlDelegateError> {
        w.push("DELETE FROM ");
        w.push_identifier(&self.table)?;
        w.push_conditions(&self.conditions)?;
        w.push_returning(&self.returning)
    }
}

/// Standalone `VALUES (...), (...)` list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Values {
    rows: Vec<Vec<Operand>>,
}

impl Values {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn row<I, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    pub(super) fn write(&self, w: &mut SqlWriter) -> Result<(), SqlDelegateError> {
        let width = self.rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(SqlDelegateError::ConfigError(
                "values list needs at least one non-empty row".into(),
            ));
        }
        if self.rows.iter().any(|row| row.len() != width) {
            return Err(SqlDelegateError::ConfigError(
                "values list rows differ in width".into(),
            ));
        }
        w.push("VALUES ");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            write_tuple(w, row.iter());
        }
        Ok(())
    }
}

fn write_tuple<'a>(w: &mut SqlWriter, operands: impl Iterator<Item = &'a Operand>) {
    w.push("(");
    for (i, operand) in operands.enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.push_operand(operand);
    }
    w.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::{delegate, delegate_pairs, value};
    use crate::query::Arg;
    use crate::query_builder::{Compile, PostgresCompiler};
    use crate::types::RowValues;

    fn compile(statement: impl Into<crate::query_builder::Statement>) -> crate::query::Query {
        PostgresCompiler.compile(&statement.into()).unwrap()
    }

    #[test]
    fn verbatim_default_is_never_bound() {
        let query = compile(
            Insert::into("users")
                .row([("id", value("DEFAULT")), ("name", Operand::from("ann"))])
                .row([("id", value("DEFAULT")), ("name", Operand::from(delegate("name")))]),
        );
        assert_eq!(
            query.sql(),
            "INSERT INTO users (id, name) VALUES (DEFAULT, $1), (DEFAULT, $2)"
        );
        assert_eq!(
            query.args(),
            &[
                Arg::Value(RowValues::Text("ann".into())),
                Arg::Delegate(delegate("name"))
            ]
        );
    }

    #[test]
    fn insert_rejects_ragged_rows() {
        let insert = Insert::into("t").row([("a", 1)]).row([("b", 2)]);
        assert!(PostgresCompiler.compile(&insert.into()).is_err());
        assert!(PostgresCompiler.compile(&Insert::into("t").into()).is_err());
        let query = compile(Insert::into("t").row(Vec::<(String, Operand)>::new()));
        assert_eq!(query.sql(), "INSERT INTO t DEFAULT VALUES");
    }

    #[test]
    fn update_with_delegate_pairs() {
        let query = compile(
            Update::table("accounts")
                .set_all(delegate_pairs(["balance"]))
                .set("touched_at", value("now()"))
                .filter("id", delegate("id"))
                .returning(["balance"]),
        );
        assert_eq!(
            query.sql(),
            "UPDATE accounts SET balance = $1, touched_at = now() WHERE id = $2 RETURNING balance"
        );
        assert!(PostgresCompiler.compile(&Update::table("t").into()).is_err());
    }

    #[test]
    fn delete_and_values() {
        let query = compile(Delete::from("sessions").filter("user_id", 3));
        assert_eq!(query.sql(), "DELETE FROM sessions WHERE user_id = $1");

        let query = compile(Values::new().row([1, 2]).row([3, 4]));
        assert_eq!(query.sql(), "VALUES ($1, $2), ($3, $4)");
        assert_eq!(query.args().len(), 4);
        assert!(PostgresCompiler
            .compile(&Values::new().row([1]).row([1, 2]).into())
            .is_err());
    }
}
