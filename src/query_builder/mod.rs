//! Structured query descriptions and their compilation into a [`Query`].
//!
//! Descriptions carry [`Operand`]s: values become `$n` markers with a matching argument slot,
//! delegates become markers whose slot is bound later, and verbatim fragments are written into
//! the SQL text without a slot.
//!
//! ```rust
//! use sql_delegate::prelude::*;
//!
//! let insert = Insert::into("users")
//!     .row([("id", value("DEFAULT")), ("name", Operand::from(delegate("name")))])
//!     .returning(["id"]);
//! let query = PostgresCompiler.compile(&insert.into())?;
//! assert_eq!(query.sql(), "INSERT INTO users (id, name) VALUES (DEFAULT, $1) RETURNING id");
//! assert_eq!(query.args().len(), 1);
//! # Ok::<(), SqlDelegateError>(())
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::delegate::Operand;
use crate::error::SqlDelegateError;
use crate::query::{Arg, Query};
use crate::types::RowValues;

mod dml;
mod select;

pub use dml::{Delete, Insert, Update, Values};
pub use select::{Order, Select};

/// Turns a structured description into SQL text plus ordered argument slots.
pub trait Compile: Send + Sync {
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` when the description cannot be expressed as SQL.
    fn compile(&self, statement: &Statement) -> Result<Query, SqlDelegateError>;
}

/// Compiler producing Postgres SQL with `$n` markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCompiler;

impl Compile for PostgresCompiler {
    fn compile(&self, statement: &Statement) -> Result<Query, SqlDelegateError> {
        let mut writer = SqlWriter::default();
        match statement {
            Statement::Select(select) => select.write(&mut writer)?,
            Statement::Insert(insert) => insert.write(&mut writer)?,
            Statement::Update(update) => update.write(&mut writer)?,
            Statement::Delete(delete) => delete.write(&mut writer)?,
            Statement::Values(values) => values.write(&mut writer)?,
        }
        Ok(writer.finish())
    }
}

/// Any structured description the compiler accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Values(Values),
}

macro_rules! statement_from {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Statement {
                fn from(inner: $variant) -> Self {
                    Statement::$variant(inner)
                }
            }
        )+
    };
}

statement_from!(Select, Insert, Update, Delete, Values);

#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    sql: String,
    args: Vec<Arg>,
}

impl SqlWriter {
    pub(crate) fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    pub(crate) fn push_identifier(&mut self, name: &str) -> Result<(), SqlDelegateError> {
        let quoted = quote_identifier(name)?;
        self.sql.push_str(&quoted);
        Ok(())
    }

    pub(crate) fn push_identifiers<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> Result<(), SqlDelegateError> {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_identifier(name.as_ref())?;
        }
        Ok(())
    }

    /// Write a marker (and its slot) for values and delegates; splice verbatim text.
    pub(crate) fn push_operand(&mut self, operand: &Operand) {
        let arg = match operand {
            Operand::Verbatim(raw) => {
                self.sql.push_str(raw);
                return;
            }
            Operand::Value(value) => Arg::Value(value.clone()),
            Operand::Delegate(delegate) => Arg::Delegate(delegate.clone()),
        };
        let hint = match &arg {
            Arg::Delegate(delegate) => delegate.type_hint(),
            Arg::Value(_) => None,
        };
        self.args.push(arg);
        self.sql.push('$');
        self.sql.push_str(&self.args.len().to_string());
        if let Some(hint) = hint {
            self.sql.push_str("::");
            self.sql.push_str(hint.as_sql());
        }
    }

    /// `col = $n` for each entry joined by `AND`; a null value compares with `IS NULL`.
    pub(crate) fn push_conditions(
        &mut self,
        conditions: &[(String, Operand)],
    ) -> Result<(), SqlDelegateError> {
        if conditions.is_empty() {
            return Ok(());
        }
        self.push(" WHERE ");
        for (i, (column, operand)) in conditions.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.push_identifier(column)?;
            if matches!(operand, Operand::Value(RowValues::Null)) {
                self.push(" IS NULL");
            } else {
                self.push(" = ");
                self.push_operand(operand);
            }
        }
        Ok(())
    }

    pub(crate) fn push_returning(&mut self, columns: &[String]) -> Result<(), SqlDelegateError> {
        if columns.is_empty() {
            return Ok(());
        }
        self.push(" RETURNING ");
        self.push_identifiers(columns)
    }

    fn finish(self) -> Query {
        Query::with_args(self.sql, self.args)
    }
}

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("identifier pattern is valid")
    });
    &IDENTIFIER_REGEX
}

/// Write a possibly schema-qualified name, double-quoting parts that are not plain identifiers.
///
/// `*` passes through untouched.
pub(crate) fn quote_identifier(name: &str) -> Result<String, SqlDelegateError> {
    if name == "*" {
        return Ok(name.to_owned());
    }
    let mut out = String::with_capacity(name.len() + 2);
    for (i, part) in name.split('.').enumerate() {
        if part.is_empty() {
            return Err(SqlDelegateError::ConfigError(format!(
                "invalid identifier `{name}`"
            )));
        }
        if i > 0 {
            out.push('.');
        }
        if part == "*" || identifier_regex().is_match(part) {
            out.push_str(part);
        } else {
            out.push('"');
            out.push_str(&part.replace('"', "\"\""));
            out.push('"');
        }
    }
    Ok(out)
}
