//! Routing of query requests to raw, structured or prepared execution.
//!
//! The caller states both the shape of the request ([`Request`]) and whether it wants a reusable
//! statement back ([`PrepareMode`]); nothing is inferred from argument types at runtime.

use std::sync::Arc;

use tracing::debug;

use crate::connection::{Connection, StatementHandle};
use crate::error::SqlDelegateError;
use crate::prepared::PreparedStatement;
use crate::query::Query;
use crate::query_builder::{Compile, Statement};
use crate::results::ResultSet;
use crate::transaction::TxFlags;
use crate::types::RowValues;

/// Whether a request runs once or comes back as a prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrepareMode {
    /// Execute without preparing.
    #[default]
    Direct,
    /// Prepare the statement and return it unexecuted.
    Prepared,
}

impl From<bool> for PrepareMode {
    fn from(prepare: bool) -> Self {
        if prepare {
            PrepareMode::Prepared
        } else {
            PrepareMode::Direct
        }
    }
}

/// The three call shapes the dispatcher accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// SQL text with fixed arguments. Prepared with no arguments, every `$n` marker becomes a
    /// positional delegate of the template.
    Raw { sql: String, params: Vec<RowValues> },
    /// An already assembled query, possibly carrying delegates.
    Query(Query),
    /// A description compiled by the client's compiler first.
    Structured(Statement),
}

impl Request {
    pub fn raw(sql: impl Into<String>, params: Vec<RowValues>) -> Self {
        Request::Raw {
            sql: sql.into(),
            params,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Request::Raw { .. } => "raw",
            Request::Query(_) => "query",
            Request::Structured(_) => "structured",
        }
    }
}

impl From<Query> for Request {
    fn from(query: Query) -> Self {
        Request::Query(query)
    }
}

impl From<Statement> for Request {
    fn from(statement: Statement) -> Self {
        Request::Structured(statement)
    }
}

/// Outcome of a dispatch: rows for direct execution, a statement for prepared execution.
pub enum Dispatched<S: StatementHandle> {
    Rows(ResultSet),
    Prepared(PreparedStatement<S>),
}

impl<S: StatementHandle> std::fmt::Debug for Dispatched<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatched::Rows(rows) => f.debug_tuple("Rows").field(rows).finish(),
            Dispatched::Prepared(stmt) => f.debug_tuple("Prepared").field(stmt).finish(),
        }
    }
}

impl<S: StatementHandle> Dispatched<S> {
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` when the request was prepared instead.
    pub fn into_rows(self) -> Result<ResultSet, SqlDelegateError> {
        match self {
            Dispatched::Rows(rows) => Ok(rows),
            Dispatched::Prepared(stmt) => Err(SqlDelegateError::ConfigError(format!(
                "expected rows but `{}` was prepared",
                stmt.template()
            ))),
        }
    }

    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` when the request was executed directly.
    pub fn into_prepared(self) -> Result<PreparedStatement<S>, SqlDelegateError> {
        match self {
            Dispatched::Prepared(stmt) => Ok(stmt),
            Dispatched::Rows(_) => Err(SqlDelegateError::ConfigError(
                "expected a prepared statement but the request was executed".into(),
            )),
        }
    }
}

pub(crate) async fn dispatch<C: Connection>(
    conn: &C,
    tx: &Arc<TxFlags>,
    compiler: &dyn Compile,
    request: Request,
    mode: PrepareMode,
) -> Result<Dispatched<C::Statement>, SqlDelegateError> {
    debug!(path = request.kind(), ?mode, "dispatching");
    let query = match request {
        Request::Raw { sql, params } => match mode {
            PrepareMode::Direct => return Ok(Dispatched::Rows(conn.query(&sql, &params).await?)),
            PrepareMode::Prepared if params.is_empty() => Query::from_template(sql)?,
            PrepareMode::Prepared => Query::new(sql, params),
        },
        Request::Query(query) => query,
        Request::Structured(statement) => compiler.compile(&statement)?,
    };
    query.validate()?;

    match mode {
        PrepareMode::Direct => {
            let params = query.concrete_params()?;
            Ok(Dispatched::Rows(conn.query(query.sql(), &params).await?))
        }
        PrepareMode::Prepared => Ok(Dispatched::Prepared(prepare(conn, tx, query).await?)),
    }
}

pub(crate) async fn prepare<C: Connection>(
    conn: &C,
    tx: &Arc<TxFlags>,
    template: Query,
) -> Result<PreparedStatement<C::Statement>, SqlDelegateError> {
    debug!(sql = %template, slots = template.args().len(), "preparing");
    let handle = conn.prepare(template.sql()).await?;
    Ok(PreparedStatement::new(template, handle, Arc::clone(tx)))
}
